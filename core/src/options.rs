//! Per-request metadata sent in the `NeutrinoOptions` header.
//!
//! # Design
//! The options travel as a single JSON object. `clientId` is left out
//! entirely when there is no client id so the server can tell "no id" apart
//! from "empty id", and `filter` is left out when it has no entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Out-of-band metadata for exactly one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub filter: Map<String, Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn with_filter(mut self, filter: Map<String, Value>) -> Self {
        self.filter = filter;
        self
    }

    /// Serialize into a header value.
    pub fn encode(&self) -> ApiResult<String> {
        serde_json::to_string(self).map_err(|e| ApiError::Construction(format!("options: {e}")))
    }

    /// Parse a header value produced by [`RequestOptions::encode`].
    pub fn decode(value: &str) -> ApiResult<Self> {
        serde_json::from_str(value).map_err(|e| ApiError::Decode(format!("options: {e}")))
    }
}
