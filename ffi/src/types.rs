//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Conversion functions live here to keep
//! `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use apiworker_core::{ApiClient, ApiRequest, ApiResponse, ConnectivityFlag, HttpMethod};

/// Opaque handle to an `ApiClient` plus the connectivity flag the host
/// drives through `apiworker_client_set_online`.
pub struct FfiApiClient {
    pub(crate) inner: ApiClient,
    pub(crate) connectivity: ConnectivityFlag,
}

/// Opaque handle to an `ApiRequest` under construction.
pub struct FfiApiRequest {
    pub(crate) inner: ApiRequest,
}

/// Client settings. Null text pointers select the default texts.
#[repr(C)]
pub struct FfiClientConfig {
    pub logging: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub connection_error_text: *const c_char,
    pub empty_body_error_text: *const c_char,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request the host must execute.
///
/// Built by `apiworker_build_*`. The host sends it and passes the outcome
/// back through `apiworker_parse_response` or `apiworker_transport_failure`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: apiworker_core::HttpRequest) -> *mut Self {
        let url = into_c_string(req.url);
        let body = match req.body {
            Some(b) => into_c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response the host received.
///
/// `body` may be null when the platform had no body to hand over. The FFI
/// layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Whether an `FfiApiResult` carries a delivered envelope or reports misuse
/// of the FFI itself.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiResultKind {
    Delivered = 0,
    NullArg = 1,
    Panic = 2,
}

/// Response envelope exposed to C.
///
/// For `Delivered` results `success`, `error_code` and `error_message` mirror
/// `ApiResponse`; `has_error` is false and `error_message` null when the
/// envelope has no error. `body` holds the raw response JSON whenever it was
/// decoded, including server-reported errors, and is null otherwise.
#[repr(C)]
pub struct FfiApiResult {
    pub kind: FfiResultKind,
    pub success: bool,
    pub has_error: bool,
    pub error_code: i32,
    pub error_message: *mut c_char,
    pub body: *mut c_char,
}

impl FfiApiResult {
    pub(crate) fn delivered(response: ApiResponse, body: Option<String>) -> *mut Self {
        let (has_error, error_code, error_message) = match response.error {
            Some(err) => (true, err.code, into_c_string(err.message)),
            None => (false, 0, std::ptr::null_mut()),
        };
        Box::into_raw(Box::new(FfiApiResult {
            kind: FfiResultKind::Delivered,
            success: response.success,
            has_error,
            error_code,
            error_message,
            body: body.map(into_c_string).unwrap_or(std::ptr::null_mut()),
        }))
    }

    /// Build a misuse result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::misuse(FfiResultKind::NullArg, format!("null argument: {name}"))
    }

    /// Build a misuse result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::misuse(FfiResultKind::Panic, msg.to_string())
    }

    fn misuse(kind: FfiResultKind, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiApiResult {
            kind,
            success: false,
            has_error: false,
            error_code: 0,
            error_message: into_c_string(msg),
            body: std::ptr::null_mut(),
        }))
    }
}

// ---------------------------------------------------------------------------
// String helpers
// ---------------------------------------------------------------------------

/// Move `s` into a C string owned by the caller. Interior NULs are dropped.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let s = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(s).unwrap_or_default().into_raw()
}

/// Borrow a C string as UTF-8. Null or invalid UTF-8 yields `None`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// returned reference.
pub(crate) unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}
