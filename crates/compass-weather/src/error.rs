//! Weather fetch failure taxonomy.

use thiserror::Error;

/// Why a single weather fetch produced no snapshot.
///
/// Every variant is terminal for the fix that triggered it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeatherFetchError {
    /// No response: connect failure, timeout, or the body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx status; the body is never parsed
    #[error("HTTP error: {0}")]
    Http(u16),

    /// 2xx response whose `cod` field reports a failure
    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherFetchError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Weather unavailable. Check your connection.".to_string(),
            Self::Http(401) => "Weather service rejected the API key.".to_string(),
            Self::Http(429) => "Weather service is rate limiting requests.".to_string(),
            Self::Http(status) => format!("Weather service error ({}).", status),
            Self::Api(msg) => format!("Weather service error: {}", msg),
            Self::Parse(_) => "Weather data could not be read.".to_string(),
        }
    }

    /// Classify a transport-level reqwest failure.
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        let detail = if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_connect() {
            format!("connection failed: {}", error)
        } else if error.is_body() || error.is_decode() {
            format!("failed to read response body: {}", error)
        } else {
            error.to_string()
        };
        Self::Network(detail)
    }
}
