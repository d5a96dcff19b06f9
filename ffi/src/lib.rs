//! C-ABI wrapper around `apiworker-core`.
//!
//! # Overview
//! Lets iOS/Android host code use the request builder and the response
//! envelope rules while keeping HTTP and connectivity detection on the
//! platform side (host-does-IO):
//!
//! 1. `apiworker_build_get` / `apiworker_build_post` return the request to
//!    send, or finish the call immediately when the host reported itself
//!    offline via `apiworker_client_set_online`.
//! 2. The host executes the request.
//! 3. `apiworker_parse_response` or `apiworker_transport_failure` produces
//!    the single `FfiApiResult` for the call.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - The C caller owns all returned pointers and must call the matching
//!   `apiworker_*_free` / `apiworker_free_*` function to release them.

pub mod types;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use apiworker_core::{
    ApiClient, ApiRequest, ApiResponse, ClientConfig, ConnectivityFlag, HttpResponse, Prepared,
    TransportError,
};

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client. A null `config` selects the defaults.
///
/// The client starts online. Free it with `apiworker_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_client_new(config: *const FfiClientConfig) -> *mut FfiApiClient {
    catch_unwind(AssertUnwindSafe(|| {
        let config = if config.is_null() {
            ClientConfig::default()
        } else {
            let raw = unsafe { &*config };
            let mut config =
                ClientConfig::new(raw.logging, raw.connect_timeout_secs, raw.read_timeout_secs);
            if let Some(text) = unsafe { read_str(raw.connection_error_text) } {
                config = config.with_connection_error_text(text);
            }
            if let Some(text) = unsafe { read_str(raw.empty_body_error_text) } {
                config = config.with_empty_body_error_text(text);
            }
            config
        };
        let connectivity = ConnectivityFlag::new(true);
        let inner = ApiClient::host_driven(config, connectivity.clone());
        Box::into_raw(Box::new(FfiApiClient {
            inner,
            connectivity,
        }))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `apiworker_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_client_free(client: *mut FfiApiClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

/// Report the platform's connectivity state. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_client_set_online(client: *const FfiApiClient, online: bool) {
    if client.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &*client };
        client.connectivity.set_online(online);
    }));
}

// ---------------------------------------------------------------------------
// Request body builder
// ---------------------------------------------------------------------------

/// Create an empty request body. Free it with `apiworker_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_request_new() -> *mut FfiApiRequest {
    Box::into_raw(Box::new(FfiApiRequest {
        inner: ApiRequest::new(),
    }))
}

/// Free a request created by `apiworker_request_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_request_free(request: *mut FfiApiRequest) {
    if !request.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(request) });
        }));
    }
}

/// Apply `update` to the request behind `request` if it and both strings are
/// valid. `update` hands the request back unchanged in `Err` when it cannot
/// apply. Returns whether the update was applied.
fn update_request(
    request: *mut FfiApiRequest,
    key: *const c_char,
    value: *const c_char,
    update: impl FnOnce(ApiRequest, &str, &str) -> Result<ApiRequest, ApiRequest>,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return false;
        }
        let (Some(key), Some(value)) = (unsafe { read_str(key) }, unsafe { read_str(value) })
        else {
            return false;
        };
        let request = unsafe { &mut *request };
        let (inner, applied) = match update(std::mem::take(&mut request.inner), key, value) {
            Ok(updated) => (updated, true),
            Err(unchanged) => (unchanged, false),
        };
        request.inner = inner;
        applied
    }))
    .unwrap_or(false)
}

/// Set a flat string in `params`. Returns false on null or non-UTF-8 input.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_request_add_param(
    request: *mut FfiApiRequest,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    update_request(request, key, value, |r, k, v| Ok(r.add_to_params(k, v)))
}

/// Set a flat string in `store_params`.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_request_add_store_param(
    request: *mut FfiApiRequest,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    update_request(request, key, value, |r, k, v| Ok(r.add_to_store_params(k, v)))
}

/// Set a structured value in `params`, given as JSON text.
///
/// Returns false and leaves the key absent if `json` does not parse.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_request_add_json_param(
    request: *mut FfiApiRequest,
    key: *const c_char,
    json: *const c_char,
) -> bool {
    update_request(request, key, json, |r, k, v| {
        match serde_json::from_str::<serde_json::Value>(v) {
            Ok(value) => Ok(r.add_to_json_params(k, value)),
            Err(_) => Err(r),
        }
    })
}

/// Set a structured value in `store_params`, given as JSON text.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_request_add_json_store_param(
    request: *mut FfiApiRequest,
    key: *const c_char,
    json: *const c_char,
) -> bool {
    update_request(request, key, json, |r, k, v| {
        match serde_json::from_str::<serde_json::Value>(v) {
            Ok(value) => Ok(r.add_to_json_store_params(k, value)),
            Err(_) => Err(r),
        }
    })
}

/// Serialize the request body. Returns null if `request` is null.
/// Free the string with `apiworker_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_request_serialize(request: *const FfiApiRequest) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return std::ptr::null_mut();
        }
        let request = unsafe { &*request };
        into_c_string(request.inner.serialize())
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Call preparation
// ---------------------------------------------------------------------------

/// Turn a prepared call into either a request for the host to send or a
/// finished result written to `out_result`.
fn hand_over(
    prepared: Prepared<ApiResponse>,
    out_result: *mut *mut FfiApiResult,
) -> *mut FfiHttpRequest {
    match prepared {
        Prepared::Send(request) => FfiHttpRequest::from_core(request),
        Prepared::Done(response) => {
            let result = FfiApiResult::delivered(response, None);
            if out_result.is_null() {
                apiworker_free_result(result);
            } else {
                unsafe { *out_result = result };
            }
            std::ptr::null_mut()
        }
    }
}

/// Prepare a GET to `url`.
///
/// Returns the request to execute, or null. When the client is offline the
/// call finishes immediately: null is returned and, if `out_result` is not
/// null, `*out_result` receives the `NO_CONNECTION` result. Otherwise
/// `*out_result` is set to null. Free the request with
/// `apiworker_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_build_get(
    client: *const FfiApiClient,
    url: *const c_char,
    out_result: *mut *mut FfiApiResult,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if !out_result.is_null() {
            unsafe { *out_result = std::ptr::null_mut() };
        }
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(url) = (unsafe { read_str(url) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        hand_over(client.inner.prepare_get(url), out_result)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Prepare a POST of `request` to `url`. Same contract as
/// `apiworker_build_get`.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_build_post(
    client: *const FfiApiClient,
    url: *const c_char,
    request: *const FfiApiRequest,
    out_result: *mut *mut FfiApiResult,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if !out_result.is_null() {
            unsafe { *out_result = std::ptr::null_mut() };
        }
        if client.is_null() || request.is_null() {
            return std::ptr::null_mut();
        }
        let Some(url) = (unsafe { read_str(url) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let request = unsafe { &*request };
        hand_over(client.inner.prepare_post(url, &request.inner), out_result)
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Result classification
// ---------------------------------------------------------------------------

/// Classify a response the host received.
///
/// A null `response->body` and a body that is not a JSON object both yield
/// the `NO_BODY` error with the configured text.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_parse_response(
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiApiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiApiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiApiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        let body = unsafe { read_str(resp.body) }.map(str::to_string);
        let outcome = client
            .inner
            .classify::<ApiResponse>(Ok(HttpResponse::new(resp.status, body.clone())));
        let body = if outcome.is_decoded() { body } else { None };
        FfiApiResult::delivered(client.inner.deliver(outcome), body)
    }))
    .unwrap_or_else(|_| FfiApiResult::panic("panic in apiworker_parse_response"))
}

/// Report that the host's HTTP call failed before a response arrived.
///
/// Produces error code 0 carrying `message` (empty if null).
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_transport_failure(
    client: *const FfiApiClient,
    message: *const c_char,
) -> *mut FfiApiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiApiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let message = unsafe { read_str(message) }.unwrap_or_default().to_string();
        let response: ApiResponse = client.inner.finish(Err(TransportError::Io(message)));
        FfiApiResult::delivered(response, None)
    }))
    .unwrap_or_else(|_| FfiApiResult::panic("panic in apiworker_transport_failure"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `apiworker_build_*`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    }));
}

/// Free an `FfiApiResult`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_free_result(result: *mut FfiApiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.body);
    }));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn apiworker_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| free_c_string(s)));
    }
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};

    fn new_client() -> *mut FfiApiClient {
        apiworker_client_new(std::ptr::null())
    }

    fn c_str<'a>(ptr: *const c_char) -> &'a str {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
    }

    fn parse(client: *const FfiApiClient, body: Option<&str>) -> *mut FfiApiResult {
        let body = body.map(|b| CString::new(b).unwrap());
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ref().map_or(std::ptr::null(), |b| b.as_ptr()),
        };
        apiworker_parse_response(client, &resp)
    }

    #[test]
    fn client_new_and_free() {
        let client = new_client();
        assert!(!client.is_null());
        apiworker_client_free(client);
    }

    #[test]
    fn client_new_with_custom_texts() {
        let offline = CString::new("offline").unwrap();
        let config = FfiClientConfig {
            logging: false,
            connect_timeout_secs: 3,
            read_timeout_secs: 4,
            connection_error_text: offline.as_ptr(),
            empty_body_error_text: std::ptr::null(),
        };
        let client = apiworker_client_new(&config);
        apiworker_client_set_online(client, false);

        let url = CString::new("http://localhost:3000/status").unwrap();
        let mut result: *mut FfiApiResult = std::ptr::null_mut();
        let req = apiworker_build_get(client, url.as_ptr(), &mut result);
        assert!(req.is_null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, 900);
        assert_eq!(c_str(r.error_message), "offline");

        let result2 = parse(client, None);
        assert_eq!(c_str(unsafe { &*result2 }.error_message), "no body");

        apiworker_free_result(result);
        apiworker_free_result(result2);
        apiworker_client_free(client);
    }

    #[test]
    fn client_free_null_is_safe() {
        apiworker_client_free(std::ptr::null_mut());
        apiworker_client_set_online(std::ptr::null(), true);
    }

    #[test]
    fn request_builder_serializes_both_namespaces() {
        let request = apiworker_request_new();
        let a = CString::new("a").unwrap();
        let one = CString::new("1").unwrap();
        let b = CString::new("b").unwrap();
        let two = CString::new("2").unwrap();
        let token = CString::new("token").unwrap();
        let abc = CString::new("abc").unwrap();
        assert!(apiworker_request_add_param(request, a.as_ptr(), one.as_ptr()));
        assert!(apiworker_request_add_json_param(request, b.as_ptr(), two.as_ptr()));
        assert!(apiworker_request_add_store_param(request, token.as_ptr(), abc.as_ptr()));

        let body = apiworker_request_serialize(request);
        assert_eq!(
            c_str(body),
            r#"{"params":{"a":"1","b":2},"store_params":{"token":"abc"}}"#
        );

        apiworker_free_string(body);
        apiworker_request_free(request);
    }

    #[test]
    fn invalid_json_param_is_rejected_and_absent() {
        let request = apiworker_request_new();
        let key = CString::new("bad").unwrap();
        let json = CString::new("{not json").unwrap();
        assert!(!apiworker_request_add_json_store_param(request, key.as_ptr(), json.as_ptr()));

        let body = apiworker_request_serialize(request);
        assert_eq!(c_str(body), "{}");

        apiworker_free_string(body);
        apiworker_request_free(request);
    }

    #[test]
    fn rejected_json_param_keeps_earlier_params() {
        let request = apiworker_request_new();
        let a = CString::new("a").unwrap();
        let one = CString::new("1").unwrap();
        let bad = CString::new("bad").unwrap();
        let json = CString::new("[1,").unwrap();
        assert!(apiworker_request_add_param(request, a.as_ptr(), one.as_ptr()));
        assert!(!apiworker_request_add_json_param(request, bad.as_ptr(), json.as_ptr()));
        assert!(apiworker_request_add_json_param(request, bad.as_ptr(), one.as_ptr()));

        let body = apiworker_request_serialize(request);
        assert_eq!(c_str(body), r#"{"params":{"a":"1","bad":1}}"#);

        apiworker_free_string(body);
        apiworker_request_free(request);
    }

    #[test]
    fn request_add_with_null_args_fails() {
        let key = CString::new("k").unwrap();
        assert!(!apiworker_request_add_param(std::ptr::null_mut(), key.as_ptr(), key.as_ptr()));
        let request = apiworker_request_new();
        assert!(!apiworker_request_add_param(request, key.as_ptr(), std::ptr::null()));
        apiworker_request_free(request);
    }

    #[test]
    fn build_get_online_returns_request() {
        let client = new_client();
        let url = CString::new("http://localhost:3000/status").unwrap();
        let mut result: *mut FfiApiResult = std::ptr::null_mut();
        let req = apiworker_build_get(client, url.as_ptr(), &mut result);
        assert!(!req.is_null());
        assert!(result.is_null());

        let req_ref = unsafe { &*req };
        assert!(matches!(req_ref.method, FfiHttpMethod::Get));
        assert_eq!(c_str(req_ref.url), "http://localhost:3000/status");
        assert!(req_ref.body.is_null());
        assert_eq!(req_ref.headers_len, 0);

        apiworker_free_request(req);
        apiworker_client_free(client);
    }

    #[test]
    fn build_post_carries_json_body() {
        let client = new_client();
        let request = apiworker_request_new();
        let key = CString::new("login").unwrap();
        let value = CString::new("olena").unwrap();
        apiworker_request_add_param(request, key.as_ptr(), value.as_ptr());

        let url = CString::new("http://localhost:3000/login").unwrap();
        let req = apiworker_build_post(client, url.as_ptr(), request, std::ptr::null_mut());
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert!(matches!(req_ref.method, FfiHttpMethod::Post));
        assert_eq!(req_ref.headers_len, 1);
        let header = unsafe { &*req_ref.headers };
        assert_eq!(c_str(header.key), "content-type");
        assert_eq!(c_str(header.value), "application/json");
        assert_eq!(c_str(req_ref.body), r#"{"params":{"login":"olena"}}"#);

        apiworker_free_request(req);
        apiworker_request_free(request);
        apiworker_client_free(client);
    }

    #[test]
    fn build_offline_without_out_pointer_returns_null() {
        let client = new_client();
        apiworker_client_set_online(client, false);
        let url = CString::new("http://localhost:3000/status").unwrap();
        let req = apiworker_build_get(client, url.as_ptr(), std::ptr::null_mut());
        assert!(req.is_null());
        apiworker_client_free(client);
    }

    #[test]
    fn parse_success_body() {
        let client = new_client();
        let result = parse(client, Some(r#"{"balance":10}"#));
        let r = unsafe { &*result };
        assert_eq!(r.kind, FfiResultKind::Delivered);
        assert!(r.success);
        assert!(!r.has_error);
        assert!(r.error_message.is_null());
        assert_eq!(c_str(r.body), r#"{"balance":10}"#);

        apiworker_free_result(result);
        apiworker_client_free(client);
    }

    #[test]
    fn parse_server_error_keeps_body() {
        let client = new_client();
        let result = parse(client, Some(r#"{"error":{"code":42,"message":"bad token"}}"#));
        let r = unsafe { &*result };
        assert!(!r.success);
        assert!(r.has_error);
        assert_eq!(r.error_code, 42);
        assert_eq!(c_str(r.error_message), "bad token");
        assert!(!r.body.is_null());

        apiworker_free_result(result);
        apiworker_client_free(client);
    }

    #[test]
    fn parse_missing_and_malformed_bodies() {
        let client = new_client();
        for body in [None, Some(""), Some("oops")] {
            let result = parse(client, body);
            let r = unsafe { &*result };
            assert!(!r.success);
            assert_eq!(r.error_code, 899);
            assert_eq!(c_str(r.error_message), "no body");
            assert!(r.body.is_null());
            apiworker_free_result(result);
        }
        apiworker_client_free(client);
    }

    #[test]
    fn transport_failure_is_code_zero() {
        let client = new_client();
        let message = CString::new("timeout").unwrap();
        let result = apiworker_transport_failure(client, message.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, 0);
        assert!(r.has_error);
        assert_eq!(c_str(r.error_message), "timeout");

        apiworker_free_result(result);
        apiworker_client_free(client);
    }

    #[test]
    fn parse_null_args() {
        let result = parse(std::ptr::null(), Some("{}"));
        assert_eq!(unsafe { &*result }.kind, FfiResultKind::NullArg);
        apiworker_free_result(result);

        let client = new_client();
        let result = apiworker_parse_response(client, std::ptr::null());
        assert_eq!(unsafe { &*result }.kind, FfiResultKind::NullArg);
        apiworker_free_result(result);
        apiworker_client_free(client);
    }

    #[test]
    fn free_null_is_safe() {
        apiworker_free_request(std::ptr::null_mut());
        apiworker_free_result(std::ptr::null_mut());
        apiworker_free_string(std::ptr::null_mut());
        apiworker_request_free(std::ptr::null_mut());
    }
}
