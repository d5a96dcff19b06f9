//! Response envelope types.
//!
//! # Design
//! `ApiResponse` is the base envelope every response shape extends. Richer
//! shapes embed it with `#[serde(flatten)]` and implement `Envelope` so the
//! client can read the error field, force `success`, and synthesize an
//! error-only value of the same shape without knowing the payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Success flag plus optional error, as delivered to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// An unsuccessful envelope carrying `error`.
    pub fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }
}

/// A response shape that structurally extends `ApiResponse`.
///
/// ```ignore
/// #[derive(Debug, Default, Deserialize)]
/// struct ProfileResponse {
///     #[serde(flatten)]
///     base: ApiResponse,
///     name: Option<String>,
/// }
///
/// impl Envelope for ProfileResponse {
///     fn envelope(&self) -> &ApiResponse { &self.base }
///     fn envelope_mut(&mut self) -> &mut ApiResponse { &mut self.base }
/// }
/// ```
///
/// Payload fields should tolerate absence (`Option` or `#[serde(default)]`),
/// since a server error body usually carries only `error`.
pub trait Envelope: DeserializeOwned + Default + Send + 'static {
    fn envelope(&self) -> &ApiResponse;

    fn envelope_mut(&mut self) -> &mut ApiResponse;

    fn error(&self) -> Option<&ApiError> {
        self.envelope().error.as_ref()
    }

    fn is_success(&self) -> bool {
        self.envelope().success
    }

    /// Build a value of this shape that carries only `error`.
    fn from_error(error: ApiError) -> Self {
        let mut response = Self::default();
        *response.envelope_mut() = ApiResponse::failure(error);
        response
    }
}

impl Envelope for ApiResponse {
    fn envelope(&self) -> &ApiResponse {
        self
    }

    fn envelope_mut(&mut self) -> &mut ApiResponse {
        self
    }
}
