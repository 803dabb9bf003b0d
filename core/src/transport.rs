//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the only place the client performs I/O. `UreqTransport` is
//! the blocking implementation used in production; tests can swap in a fake
//! that records requests and replays canned responses.

use std::time::Duration;

use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations return every status code as data. Only failures where no
/// response was received map to `ApiError::Transport`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> ApiResult<HttpResponse>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole call, including reading the body. An expired
    /// deadline aborts the request with `ApiError::Transport`.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match (request.method, body) {
            (HttpMethod::Get, None) => prepare(self.agent.get(url), request).call(),
            (HttpMethod::Get, Some(body)) => prepare(self.agent.get(url), request)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Delete, None) => prepare(self.agent.delete(url), request).call(),
            (HttpMethod::Delete, Some(body)) => prepare(self.agent.delete(url), request)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Post, Some(body)) => prepare(self.agent.post(url), request).send(body.as_bytes()),
            (HttpMethod::Post, None) => prepare(self.agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => prepare(self.agent.put(url), request).send(body.as_bytes()),
            (HttpMethod::Put, None) => prepare(self.agent.put(url), request).send_empty(),
        };

        let mut response = result.map_err(|e| {
            warn!(method = %request.method, url, error = %e, "request failed before a response arrived");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        // The whole body is read regardless of size; ureq's default cap is 10 MiB.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| ApiError::Transport(format!("reading response body: {e}")))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Attach headers and, if the request carries one, its own deadline.
fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = request.timeout {
        builder = builder.config().timeout_global(Some(timeout)).build();
    }
    builder
}
