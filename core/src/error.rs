//! Error values carried inside response envelopes.
//!
//! # Design
//! Every failure a caller can observe is an `ApiError` value sitting in the
//! `error` field of the response envelope, never a Rust `Err`. Locally
//! synthesized failures use reserved sentinel codes so callers can tell them
//! apart from codes assigned by the server. `TransportError` exists only on
//! the transport seam and is converted to an `ApiError` before delivery.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A numeric error code plus a human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// The response carried no body, or the body could not be decoded.
    pub const NO_BODY: i32 = 899;

    /// The device was offline; no request was sent.
    pub const NO_CONNECTION: i32 = 900;

    /// The transport failed before a response was received.
    pub const TRANSPORT: i32 = 0;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classify this error by its code.
    ///
    /// Sentinel codes are reserved, so a server that reuses one of them is
    /// indistinguishable from the local failure it names.
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            Self::NO_CONNECTION => ErrorKind::NoConnection,
            Self::NO_BODY => ErrorKind::EmptyOrMalformedBody,
            Self::TRANSPORT => ErrorKind::TransportFault,
            _ => ErrorKind::Application,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Broad category of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoConnection,
    EmptyOrMalformedBody,
    TransportFault,
    /// Code and message were supplied by the server.
    Application,
}

/// Failure raised by a `Transport` before any response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("{0}")]
    Io(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("failed to connect: {0}")]
    Connect(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_sentinel_codes() {
        assert_eq!(ApiError::new(900, "x").kind(), ErrorKind::NoConnection);
        assert_eq!(ApiError::new(899, "x").kind(), ErrorKind::EmptyOrMalformedBody);
        assert_eq!(ApiError::new(0, "x").kind(), ErrorKind::TransportFault);
        assert_eq!(ApiError::new(42, "x").kind(), ErrorKind::Application);
    }

    #[test]
    fn decodes_with_missing_fields() {
        let err: ApiError = serde_json::from_str(r#"{"code":42}"#).unwrap();
        assert_eq!(err.code, 42);
        assert_eq!(err.message, "");

        let err: ApiError = serde_json::from_str(r#"{"message":"oops"}"#).unwrap();
        assert_eq!(err.code, 0);
        assert_eq!(err.message, "oops");
    }

    #[test]
    fn transport_error_display() {
        assert_eq!(TransportError::Io("broken pipe".into()).to_string(), "broken pipe");
        assert_eq!(
            TransportError::Connect("refused".into()).to_string(),
            "failed to connect: refused"
        );
    }
}
