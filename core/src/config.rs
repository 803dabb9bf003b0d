//! Process-wide client configuration.
//!
//! Loaded once by the application's composition root and handed to a
//! `ClientRegistry`; every client created by that registry inherits it.

use std::env;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_HTTP_ADDR: &str = "http://localhost:5000/v1/";
pub const DEFAULT_WS_ADDR: &str = "ws://localhost:6000/v1/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL that endpoint paths are appended to. Should end with `/`.
    pub http_addr: String,
    /// Real-time address. Carried for the host application; unused here.
    pub ws_addr: String,
    /// Token every new client starts with. Empty means unauthenticated.
    pub token: String,
    pub origin: String,
    /// Deadline for a single request, body included.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(http_addr: impl Into<String>) -> Self {
        Self {
            http_addr: http_addr.into(),
            ..Self::default()
        }
    }

    /// Load configuration from `NEUTRINO_*` environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let timeout = match lookup("NEUTRINO_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|e| ApiError::Config(format!("NEUTRINO_TIMEOUT_SECS must be a whole number: {e}")))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            http_addr: lookup("NEUTRINO_HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            ws_addr: lookup("NEUTRINO_WS_ADDR").unwrap_or_else(|| DEFAULT_WS_ADDR.to_string()),
            token: lookup("NEUTRINO_TOKEN").unwrap_or_default(),
            origin: lookup("NEUTRINO_ORIGIN").unwrap_or_default(),
            timeout,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            ws_addr: DEFAULT_WS_ADDR.to_string(),
            token: String::new(),
            origin: String::new(),
            timeout: None,
        }
    }
}
