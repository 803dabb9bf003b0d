//! HTTP request builder, dispatch pipeline and domain methods for the
//! Neutrino API.
//!
//! # Design
//! `NeutrinoClient` keeps its fixed configuration (base URL, application id,
//! origin, transport) separate from the mutable session (token, client id,
//! notify flag, filter). The session sits behind a lock so a client shared
//! through `ClientRegistry` can be updated by whoever owns it, but the lock is
//! never held across I/O. Concurrent logins on one client race; serializing
//! them is the caller's job.
//!
//! Every request goes through the same four steps: encode options, build the
//! `HttpRequest`, execute it on the `Transport`, decode the body with the
//! endpoint's shape. Domain methods only pick a row from the endpoint table
//! and pull fields out of the decoded payload.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::endpoint::{Endpoint, PathParams};
use crate::error::{ApiError, ApiResult};
use crate::http::{HttpMethod, HttpRequest, OPTIONS_HEADER};
use crate::options::RequestOptions;
use crate::record::{Payload, Record, Shape};
use crate::response::parse_response;
use crate::transport::Transport;

#[derive(Debug, Clone, Default)]
struct Session {
    token: String,
    client_id: Option<String>,
    notify_real_time: bool,
    filter: Map<String, Value>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client bound to one application id.
pub struct NeutrinoClient {
    base_url: String,
    app_id: String,
    origin: String,
    transport: Arc<dyn Transport>,
    session: RwLock<Session>,
}

impl fmt::Debug for NeutrinoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeutrinoClient")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("origin", &self.origin)
            .field("authenticated", &!self.token().is_empty())
            .finish_non_exhaustive()
    }
}

impl NeutrinoClient {
    pub fn new(config: &ClientConfig, app_id: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: config.http_addr.clone(),
            app_id: app_id.into(),
            origin: config.origin.clone(),
            transport,
            session: RwLock::new(Session {
                token: config.token.clone(),
                ..Session::default()
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn token(&self) -> String {
        self.read_session().token.clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.write_session().token = token.into();
    }

    pub fn client_id(&self) -> Option<String> {
        self.read_session().client_id.clone()
    }

    /// An empty id clears it.
    pub fn set_client_id(&self, client_id: impl Into<String>) {
        let client_id = client_id.into();
        self.write_session().client_id = (!client_id.is_empty()).then_some(client_id);
    }

    pub fn notify_real_time(&self) -> bool {
        self.read_session().notify_real_time
    }

    pub fn set_notify_real_time(&self, notify: bool) {
        self.write_session().notify_real_time = notify;
    }

    pub fn filter(&self) -> Map<String, Value> {
        self.read_session().filter.clone()
    }

    pub fn set_filter(&self, filter: Map<String, Value>) {
        self.write_session().filter = filter;
    }

    /// Options derived from the current session, used when a call does not
    /// supply its own.
    pub fn request_options(&self) -> RequestOptions {
        let session = self.read_session();
        RequestOptions {
            client_id: session.client_id.clone(),
            notify: session.notify_real_time,
            filter: session.filter.clone(),
        }
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Assemble a request without performing I/O.
    ///
    /// The URL is `base_url + path` with no slash handling. `Authorization`
    /// is set only when the client holds a token; the options header is
    /// always set.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> ApiResult<HttpRequest> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Construction(format!("body: {e}")))?;
        let encoded_options = options.encode()?;

        let mut headers = Vec::with_capacity(3);
        let token = self.token();
        if !token.is_empty() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers.push((OPTIONS_HEADER.to_string(), encoded_options));
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body,
            timeout: None,
        })
    }

    /// Build the request for one endpoint table row.
    pub fn build_endpoint(
        &self,
        endpoint: Endpoint,
        params: &PathParams<'_>,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> ApiResult<HttpRequest> {
        let path = endpoint.path(params)?;
        self.build_request(endpoint.route().method, &path, body, options)
    }

    /// Execute a built request and decode the response as `shape`.
    pub fn send(&self, request: &HttpRequest, shape: Shape) -> ApiResult<Payload> {
        let options = request
            .header(OPTIONS_HEADER)
            .and_then(|raw| RequestOptions::decode(raw).ok());
        self.dispatch(request, shape, options.as_ref())
    }

    fn dispatch(&self, request: &HttpRequest, shape: Shape, options: Option<&RequestOptions>) -> ApiResult<Payload> {
        debug!(
            method = %request.method,
            url = %request.url,
            app_id = %self.app_id,
            authenticated = request.header("authorization").is_some(),
            notify = options.is_some_and(|o| o.notify),
            has_client_id = options.is_some_and(|o| o.client_id.is_some()),
            has_body = request.body.is_some(),
            timeout_ms = request.timeout.map(|t| t.as_millis() as u64),
            "sending request"
        );
        let response = self.transport.execute(request)?;
        parse_response(response, shape)
    }

    /// Call an endpoint with options derived from the session.
    pub fn call(&self, endpoint: Endpoint, params: &PathParams<'_>, body: Option<&Value>) -> ApiResult<Payload> {
        self.call_with(endpoint, params, body, &self.request_options())
    }

    /// Call an endpoint with explicit options.
    pub fn call_with(
        &self,
        endpoint: Endpoint,
        params: &PathParams<'_>,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> ApiResult<Payload> {
        let request = self.build_endpoint(endpoint, params, body, options)?;
        self.dispatch(&request, endpoint.route().shape, Some(options))
    }

    /// Like [`NeutrinoClient::call_with`], but the request is aborted with
    /// `ApiError::Transport` once `timeout` elapses, whatever the transport's
    /// default deadline is.
    pub fn call_with_timeout(
        &self,
        endpoint: Endpoint,
        params: &PathParams<'_>,
        body: Option<&Value>,
        options: &RequestOptions,
        timeout: Duration,
    ) -> ApiResult<Payload> {
        let mut request = self.build_endpoint(endpoint, params, body, options)?;
        request.timeout = Some(timeout);
        self.dispatch(&request, endpoint.route().shape, Some(options))
    }

    fn params(&self) -> PathParams<'_> {
        PathParams::app(&self.app_id)
    }

    // -----------------------------------------------------------------------
    // Apps and accounts
    // -----------------------------------------------------------------------

    /// Create an application and return its id.
    pub fn create_app(&self, name: &str) -> ApiResult<String> {
        let payload = self.call(Endpoint::CreateApp, &self.params(), Some(&json!({ "name": name })))?;
        Ok(payload.require_record()?.id()?.to_string())
    }

    pub fn list_apps(&self) -> ApiResult<Vec<Record>> {
        self.call(Endpoint::ListApps, &self.params(), None)?.into_collection()
    }

    /// Register a user within this client's application.
    pub fn app_register(&self, email: &str, password: &str) -> ApiResult<()> {
        self.call(Endpoint::AppRegister, &self.params(), Some(&credentials(email, password)?))
            .map(drop)
    }

    /// Register a platform account.
    pub fn register(&self, email: &str, password: &str) -> ApiResult<()> {
        self.call(Endpoint::Register, &self.params(), Some(&credentials(email, password)?))
            .map(drop)
    }

    /// Log in as an application user. The returned token is stored and sent
    /// with every following request from this client.
    pub fn app_login(&self, email: &str, password: &str) -> ApiResult<String> {
        self.login_at(Endpoint::AppLogin, email, password)
    }

    /// Log in as a platform account. The token is stored like `app_login`.
    pub fn login(&self, email: &str, password: &str) -> ApiResult<String> {
        self.login_at(Endpoint::Login, email, password)
    }

    fn login_at(&self, endpoint: Endpoint, email: &str, password: &str) -> ApiResult<String> {
        let payload = self.call(endpoint, &self.params(), Some(&credentials(email, password)?))?;
        let token = payload.require_record()?.str_field("token")?.to_string();
        self.set_token(token.clone());
        info!(app_id = %self.app_id, ?endpoint, "logged in");
        Ok(token)
    }

    // -----------------------------------------------------------------------
    // Data
    // -----------------------------------------------------------------------

    pub fn create_item(&self, record_type: &str, item: &Record) -> ApiResult<Option<Record>> {
        let params = self.params().with_type(record_type);
        self.call(Endpoint::CreateItem, &params, Some(&Value::from(item.clone())))?
            .into_record()
    }

    pub fn get_item(&self, record_type: &str, id: &str) -> ApiResult<Option<Record>> {
        let params = self.params().with_type(record_type).with_id(id);
        self.call(Endpoint::GetItem, &params, None)?.into_record()
    }

    pub fn update_item(&self, record_type: &str, id: &str, item: &Record) -> ApiResult<Option<Record>> {
        let params = self.params().with_type(record_type).with_id(id);
        self.call(Endpoint::UpdateItem, &params, Some(&Value::from(item.clone())))?
            .into_record()
    }

    pub fn delete_item(&self, record_type: &str, id: &str) -> ApiResult<Option<Record>> {
        let params = self.params().with_type(record_type).with_id(id);
        self.call(Endpoint::DeleteItem, &params, None)?.into_record()
    }

    /// List the items of one type. The session filter narrows the result.
    pub fn list_items(&self, record_type: &str) -> ApiResult<Vec<Record>> {
        let params = self.params().with_type(record_type);
        self.call(Endpoint::ListItems, &params, None)?.into_collection()
    }

    /// Names of the record types stored in this application.
    pub fn list_collections(&self) -> ApiResult<Vec<String>> {
        self.call(Endpoint::ListCollections, &self.params(), None)?
            .into_names()
    }
}

fn credentials(email: &str, password: &str) -> ApiResult<Value> {
    serde_json::to_value(Credentials { email, password }).map_err(|e| ApiError::Construction(format!("body: {e}")))
}
