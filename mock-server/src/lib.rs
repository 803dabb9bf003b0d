//! In-memory stand-in for the Neutrino HTTP API.
//!
//! Serves the same routes as the real backend under `/v1`, keeps everything
//! in a single `RwLock`-guarded `Backend`, and answers every success with 200.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const OPTIONS_HEADER: &str = "neutrinooptions";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppInfo {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateApp {
    pub name: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Subset of the options header the backend acts on.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub filter: Map<String, Value>,
}

/// Who a token was issued to.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Scope {
    Platform,
    App(String),
}

struct App {
    info: AppInfo,
    users: HashMap<String, String>,
    data: BTreeMap<String, Vec<Map<String, Value>>>,
}

#[derive(Default)]
pub struct Backend {
    accounts: HashMap<String, String>,
    apps: Vec<App>,
    tokens: HashMap<String, Scope>,
}

impl Backend {
    fn app(&self, id: &str) -> Result<&App, Rejection> {
        self.apps
            .iter()
            .find(|a| a.info.id == id)
            .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("app {id} not found")))
    }

    fn app_mut(&mut self, id: &str) -> Result<&mut App, Rejection> {
        self.apps
            .iter_mut()
            .find(|a| a.info.id == id)
            .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("app {id} not found")))
    }

    fn issue_token(&mut self, scope: Scope) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), scope);
        token
    }

    /// Platform tokens open every route; app tokens only their own app.
    fn authorize(&self, headers: &HeaderMap, app: Option<&str>) -> Result<(), Rejection> {
        let token = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
        match (self.tokens.get(token), app) {
            (Some(Scope::Platform), _) => Ok(()),
            (Some(Scope::App(owner)), Some(app)) if owner == app => Ok(()),
            (Some(_), _) => Err(reject(StatusCode::FORBIDDEN, "token not valid for this app")),
            (None, _) => Err(reject(StatusCode::UNAUTHORIZED, "unknown token")),
        }
    }
}

pub type Db = Arc<RwLock<Backend>>;

type Rejection = (StatusCode, String);

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (status, message.into())
}

/// Parse the options header. Absent means defaults; malformed is a 400.
pub fn parse_options(headers: &HeaderMap) -> Result<Options, Rejection> {
    let Some(raw) = headers.get(OPTIONS_HEADER) else {
        return Ok(Options::default());
    };
    // `to_str` only accepts visible ASCII; filter values may be any UTF-8.
    let raw = std::str::from_utf8(raw.as_bytes())
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "options header is not UTF-8"))?;
    serde_json::from_str(raw).map_err(|e| reject(StatusCode::BAD_REQUEST, format!("bad options header: {e}")))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::default()));
    let api = Router::new()
        .route("/app", get(list_apps).post(create_app))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/app/{app}/register", post(app_register))
        .route("/app/{app}/login", post(app_login))
        .route("/app/{app}/data", get(list_collections))
        .route("/app/{app}/data/{kind}", get(list_items).post(create_item))
        .route(
            "/app/{app}/data/{kind}/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .with_state(db);
    Router::new().nest("/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- accounts ---

async fn register(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<Credentials>,
) -> Result<StatusCode, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    if backend.accounts.contains_key(&input.email) {
        return Err(reject(StatusCode::CONFLICT, "account already exists"));
    }
    backend.accounts.insert(input.email, input.password);
    Ok(StatusCode::OK)
}

async fn login(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<Credentials>,
) -> Result<Json<TokenResponse>, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    if backend.accounts.get(&input.email) != Some(&input.password) {
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }
    let token = backend.issue_token(Scope::Platform);
    Ok(Json(TokenResponse { token }))
}

async fn app_register(
    State(db): State<Db>,
    Path(app): Path<String>,
    headers: HeaderMap,
    Json(input): Json<Credentials>,
) -> Result<StatusCode, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    let users = &mut backend.app_mut(&app)?.users;
    if users.contains_key(&input.email) {
        return Err(reject(StatusCode::CONFLICT, "user already exists"));
    }
    users.insert(input.email, input.password);
    Ok(StatusCode::OK)
}

async fn app_login(
    State(db): State<Db>,
    Path(app): Path<String>,
    headers: HeaderMap,
    Json(input): Json<Credentials>,
) -> Result<Json<TokenResponse>, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    if backend.app(&app)?.users.get(&input.email) != Some(&input.password) {
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }
    let token = backend.issue_token(Scope::App(app));
    Ok(Json(TokenResponse { token }))
}

// --- apps ---

async fn create_app(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateApp>,
) -> Result<Json<AppInfo>, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    backend.authorize(&headers, None)?;
    let info = AppInfo {
        id: Uuid::new_v4().simple().to_string(),
        name: input.name,
    };
    info!(app = %info.id, name = %info.name, "created app");
    backend.apps.push(App {
        info: info.clone(),
        users: HashMap::new(),
        data: BTreeMap::new(),
    });
    Ok(Json(info))
}

async fn list_apps(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<AppInfo>>, Rejection> {
    parse_options(&headers)?;
    let backend = db.read().await;
    backend.authorize(&headers, None)?;
    Ok(Json(backend.apps.iter().map(|a| a.info.clone()).collect()))
}

// --- data ---

async fn list_collections(
    State(db): State<Db>,
    Path(app): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, Rejection> {
    parse_options(&headers)?;
    let backend = db.read().await;
    backend.authorize(&headers, Some(&app))?;
    Ok(Json(backend.app(&app)?.data.keys().cloned().collect()))
}

async fn list_items(
    State(db): State<Db>,
    Path((app, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Vec<Map<String, Value>>>, Rejection> {
    let options = parse_options(&headers)?;
    let backend = db.read().await;
    backend.authorize(&headers, Some(&app))?;
    let items: Vec<Map<String, Value>> = backend
        .app(&app)?
        .data
        .get(&kind)
        .map(|items| {
            items
                .iter()
                .filter(|item| options.filter.iter().all(|(k, v)| item.get(k) == Some(v)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Ok(Json(items))
}

async fn create_item(
    State(db): State<Db>,
    Path((app, kind)): Path<(String, String)>,
    headers: HeaderMap,
    Json(mut item): Json<Map<String, Value>>,
) -> Result<Json<Map<String, Value>>, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    backend.authorize(&headers, Some(&app))?;
    item.insert("id".to_string(), Value::String(Uuid::new_v4().simple().to_string()));
    backend
        .app_mut(&app)?
        .data
        .entry(kind)
        .or_default()
        .push(item.clone());
    Ok(Json(item))
}

async fn get_item(
    State(db): State<Db>,
    Path((app, kind, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<Map<String, Value>>, Rejection> {
    parse_options(&headers)?;
    let backend = db.read().await;
    backend.authorize(&headers, Some(&app))?;
    backend
        .app(&app)?
        .data
        .get(&kind)
        .and_then(|items| items.iter().find(|item| has_id(item, &id)))
        .cloned()
        .map(Json)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{kind}/{id} not found")))
}

async fn update_item(
    State(db): State<Db>,
    Path((app, kind, id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Map<String, Value>>, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    backend.authorize(&headers, Some(&app))?;
    let item = backend
        .app_mut(&app)?
        .data
        .get_mut(&kind)
        .and_then(|items| items.iter_mut().find(|item| has_id(item, &id)))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{kind}/{id} not found")))?;
    for (key, value) in changes {
        if key != "id" {
            item.insert(key, value);
        }
    }
    Ok(Json(item.clone()))
}

async fn delete_item(
    State(db): State<Db>,
    Path((app, kind, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<Map<String, Value>>, Rejection> {
    parse_options(&headers)?;
    let mut backend = db.write().await;
    backend.authorize(&headers, Some(&app))?;
    let items = backend
        .app_mut(&app)?
        .data
        .get_mut(&kind)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{kind} not found")))?;
    let index = items
        .iter()
        .position(|item| has_id(item, &id))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{kind}/{id} not found")))?;
    Ok(Json(items.remove(index)))
}

fn has_id(item: &Map<String, Value>, id: &str) -> bool {
    item.get("id").and_then(Value::as_str) == Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_options_header_uses_defaults() {
        let options = parse_options(&HeaderMap::new()).unwrap();
        assert!(options.client_id.is_none());
        assert!(!options.notify);
        assert!(options.filter.is_empty());
    }

    #[test]
    fn options_header_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            OPTIONS_HEADER,
            HeaderValue::from_static(r#"{"clientId":"c1","notify":true,"filter":{"done":true}}"#),
        );
        let options = parse_options(&headers).unwrap();
        assert_eq!(options.client_id.as_deref(), Some("c1"));
        assert!(options.notify);
        assert_eq!(options.filter.get("done"), Some(&Value::Bool(true)));
    }

    #[test]
    fn non_ascii_options_header_is_parsed() {
        let mut headers = HeaderMap::new();
        let raw = r#"{"notify":false,"filter":{"title":"Café"}}"#;
        headers.insert(OPTIONS_HEADER, HeaderValue::from_bytes(raw.as_bytes()).unwrap());
        let options = parse_options(&headers).unwrap();
        assert_eq!(options.filter.get("title"), Some(&Value::String("Café".to_string())));
    }

    #[test]
    fn invalid_utf8_options_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(OPTIONS_HEADER, HeaderValue::from_bytes(&[b'{', 0xff, b'}']).unwrap());
        let (status, _) = parse_options(&headers).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn malformed_options_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(OPTIONS_HEADER, HeaderValue::from_static("{nope"));
        let (status, _) = parse_options(&headers).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn app_tokens_are_scoped() {
        let mut backend = Backend::default();
        let token = backend.issue_token(Scope::App("a1".to_string()));
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert!(backend.authorize(&headers, Some("a1")).is_ok());
        assert_eq!(backend.authorize(&headers, Some("a2")).unwrap_err().0, StatusCode::FORBIDDEN);
        assert_eq!(backend.authorize(&headers, None).unwrap_err().0, StatusCode::FORBIDDEN);
    }

    #[test]
    fn credentials_require_both_fields() {
        let result: Result<Credentials, _> = serde_json::from_str(r#"{"email":"a@b.c"}"#);
        assert!(result.is_err());
    }
}
