//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_CONNECTION_ERROR_TEXT: &str = "no connection";
pub const DEFAULT_EMPTY_BODY_ERROR_TEXT: &str = "no body";

/// Settings fixed at client construction.
///
/// Deserializes from JSON with timeouts given in whole seconds:
/// `{"logging": true, "connect_timeout_secs": 15, "read_timeout_secs": 30}`.
/// Omitted fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawConfig")]
pub struct ClientConfig {
    /// Log request and response bodies.
    pub logging: bool,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Message used for the offline error.
    pub connection_error_text: String,
    /// Message used when a body is missing or undecodable.
    pub empty_body_error_text: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            logging: false,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            connection_error_text: DEFAULT_CONNECTION_ERROR_TEXT.to_string(),
            empty_body_error_text: DEFAULT_EMPTY_BODY_ERROR_TEXT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(logging: bool, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            logging,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            read_timeout: Duration::from_secs(read_timeout_secs),
            ..Self::default()
        }
    }

    pub fn with_connection_error_text(mut self, text: impl Into<String>) -> Self {
        self.connection_error_text = text.into();
        self
    }

    pub fn with_empty_body_error_text(mut self, text: impl Into<String>) -> Self {
        self.empty_body_error_text = text.into();
        self
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawConfig {
    logging: bool,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
    connection_error_text: String,
    empty_body_error_text: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            logging: defaults.logging,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            read_timeout_secs: defaults.read_timeout.as_secs(),
            connection_error_text: defaults.connection_error_text,
            empty_body_error_text: defaults.empty_body_error_text,
        }
    }
}

impl From<RawConfig> for ClientConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            logging: raw.logging,
            connect_timeout: Duration::from_secs(raw.connect_timeout_secs),
            read_timeout: Duration::from_secs(raw.read_timeout_secs),
            connection_error_text: raw.connection_error_text,
            empty_body_error_text: raw.empty_body_error_text,
        }
    }
}
