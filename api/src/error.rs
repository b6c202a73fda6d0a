//! Error types for the ticketing API client

use thiserror::Error;

/// Errors that can occur when talking to the ticketing API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, TLS, reset)
    #[error("Request failed: {0}")]
    Transport(String),

    /// HTTP 404: the resource does not exist
    ///
    /// Callers treat this as an expected empty state where applicable.
    #[error("Not found{}", detail(.message))]
    NotFound {
        /// `message` from the error envelope, empty when the body had none
        message: String,
    },

    /// HTTP 401/403: the session token was refused
    #[error("Unauthorized{}", detail(.message))]
    Unauthorized {
        /// `message` from the error envelope, empty when the body had none
        message: String,
    },

    /// Any other non-success status
    #[error("API error (status {status}){}", detail(.message))]
    Api {
        /// HTTP status code
        status: u16,
        /// `message` from the error envelope, empty when the body had none
        message: String,
    },

    /// 2xx response whose envelope reported `success: false`
    #[error("Request rejected: {message}")]
    Rejected {
        /// Message from the response envelope
        message: String,
    },

    /// The body could not be decoded into the expected shape
    #[error("Response parsing failed: {0}")]
    Decode(String),
}

/// `": message"`, or nothing when the server sent no message
fn detail(message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

impl ApiError {
    /// Human-readable message supplied by the server, if any
    ///
    /// Transport and decoding failures carry no server message.
    #[must_use]
    pub fn operator_message(&self) -> Option<&str> {
        let message = match self {
            Self::NotFound { message }
            | Self::Unauthorized { message }
            | Self::Api { message, .. }
            | Self::Rejected { message } => message.as_str(),
            Self::Transport(_) | Self::Decode(_) => return None,
        };

        let message = message.trim();
        if message.is_empty() { None } else { Some(message) }
    }

    /// Returns `true` for HTTP 404 responses
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}
