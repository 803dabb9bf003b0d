//! Error types for the Neutrino API client.
//!
//! # Design
//! Each variant marks the pipeline stage that failed: `Construction` means the
//! request was never sent, `Transport` means no response arrived, `Server`
//! means the backend answered with something other than 200, `Decode` means
//! the body had the wrong structure, and `Field` means a decoded record lacked
//! a field a domain method needed. An empty 200 body is not an error at all;
//! it decodes to `Payload::Empty`.

use thiserror::Error;

/// Result type for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by `NeutrinoClient` and its pipeline stages.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Options or body serialization failed, or the path could not be rendered.
    #[error("request construction failed: {0}")]
    Construction(String),

    /// The request could not be delivered or the response could not be read.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned a status other than 200.
    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// The response body was not valid JSON of the expected shape.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// A decoded record is missing a field or holds the wrong type.
    #[error("field `{field}` {reason}")]
    Field { field: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn field(field: &str, reason: impl Into<String>) -> Self {
        ApiError::Field {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the HTTP status for `Server` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
