//! Classification of a call's result into exactly one terminal response.
//!
//! # Design
//! `Outcome` is the tagged result of a call. `classify` is total: every
//! transport result maps to exactly one variant, and decode failures are
//! values rather than errors. `into_response` then collapses the variant into
//! the single envelope of shape `T` the caller receives.

use crate::config::ClientConfig;
use crate::error::{ApiError, TransportError};
use crate::http::HttpResponse;
use crate::types::{ApiResponse, Envelope};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Decoded with no error field; `success` is forced on delivery.
    Accepted(T),
    /// Decoded with a server error field; delivered unchanged.
    Rejected(T),
    /// The device was offline and nothing was sent.
    NoConnection,
    /// The transport failed; carries the fault description.
    TransportFault(String),
    /// The body was missing or could not be decoded as `T`.
    EmptyBody,
}

impl<T: Envelope> Outcome<T> {
    pub fn classify(result: Result<HttpResponse, TransportError>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) => return Outcome::TransportFault(e.to_string()),
        };
        let Some(body) = response.body else {
            return Outcome::EmptyBody;
        };
        match serde_json::from_str::<T>(&body) {
            Ok(decoded) if decoded.error().is_some() => Outcome::Rejected(decoded),
            Ok(decoded) => Outcome::Accepted(decoded),
            Err(e) => match serde_json::from_str::<ApiResponse>(&body) {
                // The payload did not fit `T`, but the server still reported
                // an error; deliver it on a default payload.
                Ok(ApiResponse {
                    error: Some(error), ..
                }) => Outcome::Rejected(T::from_error(error)),
                _ => {
                    tracing::debug!(target: "apiworker", status = response.status, error = %e, "undecodable response body");
                    Outcome::EmptyBody
                }
            },
        }
    }

    pub fn into_response(self, texts: &ErrorTexts) -> T {
        match self {
            Outcome::Accepted(mut response) => {
                response.envelope_mut().success = true;
                response
            }
            Outcome::Rejected(response) => response,
            Outcome::NoConnection => T::from_error(ApiError::new(
                ApiError::NO_CONNECTION,
                texts.connection.clone(),
            )),
            Outcome::TransportFault(description) => {
                T::from_error(ApiError::new(ApiError::TRANSPORT, description))
            }
            Outcome::EmptyBody => {
                T::from_error(ApiError::new(ApiError::NO_BODY, texts.empty_body.clone()))
            }
        }
    }
}

impl<T> Outcome<T> {
    /// Whether the body was decoded, successfully or as a server error.
    pub fn is_decoded(&self) -> bool {
        matches!(self, Outcome::Accepted(_) | Outcome::Rejected(_))
    }
}

/// Messages used for locally synthesized errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTexts {
    pub connection: String,
    pub empty_body: String,
}

impl From<&ClientConfig> for ErrorTexts {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connection: config.connection_error_text.clone(),
            empty_body: config.empty_body_error_text.clone(),
        }
    }
}
