//! api-server — HTTP front end of the td to-do list service.
//!
//! Serves the to-do page, the login page and a small JSON API over the
//! `domain::service::TodoService`:
//! - Auth: login/password checked against the `Users` table; the session is a
//!   signed `auth_tkt` cookie holding the username.
//! - Authorization: group ACL, `entry` permission guards the page and API.
//! - Storage: users in memory or MySQL/Postgres (`sql` feature); items in
//!   memory, SQLite (`sqlite` feature) or MongoDB (`mongo` feature).
//!
//! Run:
//! ```bash
//! # pretty logs (default); in-memory users, SQLite items
//! cargo run -p api-server
//!
//! # production-like: Postgres users, MongoDB items
//! TD_CONFIG=td.toml USER_STORE=sql ITEM_STORE=mongo cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for the file format and environment variables.
//!

mod config;
mod stores;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRef, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use domain::acl::{AccessPolicy, Permission};
use domain::service::{Access, TodoService};
use domain::{CoreError, ItemId, NewItem, TodoItem, User};
use password_auth::Argon2Hasher;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::stores::{AnyItems, AnyUsers, StartupError};

/// Name of the signed session cookie.
const AUTH_COOKIE: &str = "auth_tkt";
/// Seconds browsers may cache pages and static assets.
const STATIC_MAX_AGE: u32 = 3600;
/// Category given to items posted in the legacy `{"item": ..}` shape.
const DEFAULT_CATEGORY: &str = "general";

type Service = TodoService<AnyUsers, AnyItems, Argon2Hasher>;

#[derive(Clone)]
struct AppState {
    service: Arc<Service>,
    cookie_key: Key,
    static_dir: Arc<PathBuf>,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_insecure();

    if let Err(e) = run(cfg).await {
        error!(err = %e, "api-server failed");
        std::process::exit(1);
    }
}

async fn run(cfg: config::Config) -> Result<(), StartupError> {
    let state = build_state(&cfg).await?;
    let app = build_router(state);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    info!(%addr, "api-server listening");
    axum::serve(listener, app)
        .await
        .map_err(|source| StartupError::Bind { addr, source })
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

async fn build_state(cfg: &config::Config) -> Result<AppState, StartupError> {
    let users = stores::build_users(cfg)?;
    let items = stores::build_items(cfg).await?;
    let policy = AccessPolicy::for_groups(&cfg.entry_groups, Permission::Entry);
    let service = TodoService::new(users, items, Argon2Hasher::default(), policy);

    for seed in &cfg.seed_users {
        match service
            .register_user(&seed.username, &seed.password, &seed.groups)
            .await
        {
            Ok(()) => info!(user = %seed.username, groups = ?seed.groups, "seeded user"),
            Err(CoreError::AlreadyExists) => debug!(user = %seed.username, "seed user already present"),
            Err(e) => return Err(e.into()),
        }
    }

    let cookie_key = match &cfg.cookie_secret {
        Some(secret) => Key::derive_from(secret.as_bytes()),
        None => Key::generate(),
    };

    Ok(AppState {
        service: Arc::new(service),
        cookie_key,
        static_dir: Arc::new(cfg.static_dir.clone()),
    })
}

fn build_router(state: AppState) -> Router {
    // Request ID header name
    let x_request_id = HeaderName::from_static("x-request-id");

    let static_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            static_cache_control(),
        ))
        .service(ServeDir::new(state.static_dir.as_ref()));

    Router::new()
        .route("/", get(home))
        .route("/todo_list", get(get_todo_list_page))
        .route("/api/get_todo_list_items", get(get_todo_list_items))
        .route("/api/add_todo_list_item", post(add_todo_list_item))
        .route("/api/remove_item", post(remove_item))
        .route("/login", get(get_login_page).post(post_login))
        .route("/logout", any(logout))
        .nest_service("/static", static_files)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state)
}

fn static_cache_control() -> HeaderValue {
    HeaderValue::from_str(&http_common::cache_control_max_age(STATIC_MAX_AGE))
        .unwrap_or_else(|_| HeaderValue::from_static("max-age=3600"))
}

// 302 Found, as browsers and the bundled scripts expect.
fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(http_common::json_err("unauthorized")),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(http_common::json_error_with_message("bad_request", message)),
    )
        .into_response()
}

fn store_error(e: CoreError) -> Response {
    match e {
        CoreError::InvalidItem(msg) => {
            warn!(reason = %msg, "rejected item");
            (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message("invalid_item", &msg)),
            )
                .into_response()
        }
        other => {
            error!(err = %other, "store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
                .into_response()
        }
    }
}

/// Which kind of route is asking; decides the response for a stale session.
#[derive(Clone, Copy)]
enum Surface {
    Page,
    Api,
}

/// Resolve the session cookie to a user holding the `entry` permission.
///
/// No cookie or no permission redirects to `/login`. A signed name that is
/// no longer in the user table is a 401 on API routes.
async fn require_entry(
    state: &AppState,
    jar: &SignedCookieJar,
    surface: Surface,
) -> Result<User, Response> {
    let Some(cookie) = jar.get(AUTH_COOKIE) else {
        debug!("no session cookie, redirecting to /login");
        return Err(found("/login"));
    };
    let name = cookie.value();
    match state.service.authorize(name, Permission::Entry).await {
        Ok(Access::Granted(user)) => Ok(user),
        Ok(Access::Forbidden) => {
            info!(user = %name, permission = Permission::Entry.as_str(), "permission denied");
            Err(found("/login"))
        }
        Ok(Access::UnknownUser) => {
            warn!(user = %name, "session names an unknown user");
            match surface {
                Surface::Page => Err(found("/login")),
                Surface::Api => Err(unauthorized()),
            }
        }
        Err(e) => Err(store_error(e)),
    }
}

async fn serve_page(state: &AppState, file: &str) -> Response {
    let path = state.static_dir.join(file);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => (
            [(header::CACHE_CONTROL, static_cache_control())],
            Html(html),
        )
            .into_response(),
        Err(e) => {
            error!(path = %path.display(), err = %e, "cannot read page");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_err("not_found")),
            )
                .into_response()
        }
    }
}

async fn home() -> Response {
    found("/todo_list")
}

async fn get_todo_list_page(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    if let Err(resp) = require_entry(&state, &jar, Surface::Page).await {
        return resp;
    }
    serve_page(&state, "base.html").await
}

async fn get_login_page(State(state): State<AppState>) -> Response {
    serve_page(&state, "login.html").await
}

#[derive(Serialize)]
struct ItemsOut {
    /// `null` when the user has no items.
    items: Option<Vec<TodoItem>>,
}

async fn get_todo_list_items(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let user = match require_entry(&state, &jar, Surface::Api).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match state.service.list_items(user.id).await {
        Ok(items) => {
            debug!(user = %user.username, count = items.len(), "listed items");
            let items = if items.is_empty() { None } else { Some(items) };
            Json(ItemsOut { items }).into_response()
        }
        Err(e) => store_error(e),
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Deserialize)]
struct AddItemIn {
    #[serde(alias = "item")]
    item_value: String,
    #[serde(default = "default_category")]
    category: String,
}

// Bodies are parsed regardless of content type: the browser scripts post
// JSON text as form data.
async fn add_todo_list_item(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    body: Bytes,
) -> Response {
    let user = match require_entry(&state, &jar, Surface::Api).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let input: AddItemIn = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return bad_request(&format!("invalid JSON body: {}", e)),
    };
    let item = NewItem {
        item_value: input.item_value,
        category: input.category,
    };
    match state.service.add_item(user.id, item).await {
        Ok(id) => {
            info!(user = %user.username, id = id.as_str(), "item added");
            "OK".into_response()
        }
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
struct RemoveItemIn {
    id: String,
}

async fn remove_item(State(state): State<AppState>, jar: SignedCookieJar, body: Bytes) -> Response {
    let user = match require_entry(&state, &jar, Surface::Api).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let input: RemoveItemIn = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return bad_request(&format!("invalid JSON body: {}", e)),
    };
    let id = ItemId::new(input.id);
    match state.service.remove_item(user.id, &id).await {
        Ok(removed) => {
            info!(user = %user.username, id = id.as_str(), removed, "remove item");
            "OK".into_response()
        }
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
struct LoginIn {
    login: String,
    password: String,
}

async fn post_login(State(state): State<AppState>, jar: SignedCookieJar, body: Bytes) -> Response {
    let input: LoginIn = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return bad_request(&format!("invalid JSON body: {}", e)),
    };
    match authenticate(&state, input.login.clone(), input.password).await {
        Ok(Some(user)) => {
            info!(user = %user.username, "logged in");
            let cookie = Cookie::build((AUTH_COOKIE, user.username))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), found("/todo_list")).into_response()
        }
        Ok(None) => {
            info!(login = %input.login, "login rejected");
            unauthorized()
        }
        Err(e) => store_error(e),
    }
}

// Row lookup stays on the runtime; Argon2 verification goes to the blocking pool.
async fn authenticate(
    state: &AppState,
    login: String,
    password: String,
) -> Result<Option<User>, CoreError> {
    let Some(user) = state.service.find_user(&login).await? else {
        return Ok(None);
    };
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || service.check_password(user, &password))
        .await
        .map_err(|e| CoreError::Hashing(format!("verification task failed: {}", e)))?
}

async fn logout(jar: SignedCookieJar) -> Response {
    let user = jar.get(AUTH_COOKIE).map(|c| c.value().to_string());
    info!(user = ?user, "logged out");
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, found("/login")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use password_auth::Argon2Params;
    use tower::util::ServiceExt;

    const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static");

    async fn state() -> AppState {
        let users = AnyUsers::memory(domain::engine::EngineKind::Postgres).unwrap();
        let items = AnyItems::Memory(domain::adapters::memory_repo::InMemoryItemStore::new());
        // Cheap parameters keep the test suite fast.
        let hasher = Argon2Hasher::new(Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        });
        let service = TodoService::new(users, items, hasher, AccessPolicy::default());
        service
            .register_user("alice", "s3cret", &["users".into()])
            .await
            .unwrap();
        service
            .register_user("guest", "pw", &["guests".into()])
            .await
            .unwrap();
        AppState {
            service: Arc::new(service),
            cookie_key: Key::generate(),
            static_dir: Arc::new(PathBuf::from(STATIC_DIR)),
        }
    }

    fn post_json(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut b = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(c) = cookie {
            b = b.header(header::COOKIE, c);
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().uri(uri);
        if let Some(c) = cookie {
            b = b.header(header::COOKIE, c);
        }
        b.body(Body::empty()).unwrap()
    }

    fn location(resp: &Response) -> &str {
        resp.headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    // `name=value` part of the auth cookie set by a response.
    fn session_cookie(resp: &Response) -> String {
        let set = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .find(|v| v.starts_with(AUTH_COOKIE))
            .expect("auth cookie set");
        set.split(';').next().unwrap().to_string()
    }

    // Signed cookie for `name` without going through /login.
    fn forged_session(key: &Key, name: &str) -> String {
        let jar = SignedCookieJar::new(key.clone()).add(Cookie::new(AUTH_COOKIE, name.to_string()));
        let resp = (jar, StatusCode::OK).into_response();
        session_cookie(&resp)
    }

    async fn login(router: &Router, login: &str, password: &str) -> Response {
        let body = format!("{{\"login\":\"{}\",\"password\":\"{}\"}}", login, password);
        router
            .clone()
            .oneshot(post_json("/login", None, &body))
            .await
            .unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_todo_list() {
        let router = build_router(state().await);
        let resp = router.oneshot(get_req("/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/todo_list");
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn unauthenticated_requests_go_to_login() {
        let router = build_router(state().await);
        for uri in ["/todo_list", "/api/get_todo_list_items"] {
            let resp = router.clone().oneshot(get_req(uri, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
            assert_eq!(location(&resp), "/login");
        }
    }

    #[tokio::test]
    async fn login_success_and_failure() {
        let router = build_router(state().await);

        let resp = login(&router, "alice", "s3cret").await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/todo_list");
        let cookie = session_cookie(&resp);

        let resp = router
            .clone()
            .oneshot(get_req("/todo_list", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );

        let resp = login(&router, "alice", "wrong").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = login(&router, "nobody", "s3cret").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_logins_verify_off_the_runtime() {
        let router = build_router(state().await);
        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let router = router.clone();
                let password = if i % 2 == 0 { "s3cret" } else { "wrong" };
                tokio::spawn(async move { login(&router, "alice", password).await.status() })
            })
            .collect();
        for (i, task) in tasks.into_iter().enumerate() {
            let expected = if i % 2 == 0 {
                StatusCode::FOUND
            } else {
                StatusCode::UNAUTHORIZED
            };
            assert_eq!(task.await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn login_with_malformed_body_is_bad_request() {
        let router = build_router(state().await);
        let resp = router
            .oneshot(post_json("/login", None, "{\"login\":\"alice\"}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn user_without_entry_permission_is_redirected() {
        let router = build_router(state().await);
        let cookie = session_cookie(&login(&router, "guest", "pw").await);
        let resp = router
            .oneshot(get_req("/api/get_todo_list_items", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login");
    }

    #[tokio::test]
    async fn unknown_user_session_is_unauthorized_on_api() {
        let state = state().await;
        let cookie = forged_session(&state.cookie_key, "ghost");
        let router = build_router(state);
        let resp = router
            .clone()
            .oneshot(get_req("/api/get_todo_list_items", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = router
            .oneshot(get_req("/todo_list", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn tampered_cookie_is_ignored() {
        let router = build_router(state().await);
        let resp = router
            .oneshot(get_req(
                "/api/get_todo_list_items",
                Some("auth_tkt=alice"),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login");
    }

    #[tokio::test]
    async fn add_list_remove_round_trip() {
        let router = build_router(state().await);
        let cookie = session_cookie(&login(&router, "alice", "s3cret").await);

        // Empty list is null, not [].
        let resp = router
            .clone()
            .oneshot(get_req("/api/get_todo_list_items", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "{\"items\":null}");

        let resp = router
            .clone()
            .oneshot(post_json(
                "/api/add_todo_list_item",
                Some(&cookie),
                "{\"item_value\":\"eat\",\"category\":\"red\"}",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "OK");

        let resp = router
            .clone()
            .oneshot(get_req("/api/get_todo_list_items", Some(&cookie)))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        let items = json["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["item_value"], "eat");
        assert_eq!(items[0]["category"], "red");
        assert!(items[0].get("owner_id").is_none());
        let id = items[0]["id"].as_str().unwrap().to_string();

        let resp = router
            .clone()
            .oneshot(post_json(
                "/api/remove_item",
                Some(&cookie),
                &format!("{{\"id\":\"{}\"}}", id),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = router
            .clone()
            .oneshot(get_req("/api/get_todo_list_items", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(body_string(resp).await, "{\"items\":null}");
    }

    #[tokio::test]
    async fn removing_unknown_id_is_ok() {
        let router = build_router(state().await);
        let cookie = session_cookie(&login(&router, "alice", "s3cret").await);
        let resp = router
            .oneshot(post_json(
                "/api/remove_item",
                Some(&cookie),
                "{\"id\":\"000000000000000000000000\"}",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "OK");
    }

    #[tokio::test]
    async fn legacy_item_body_and_form_content_type() {
        let router = build_router(state().await);
        let cookie = session_cookie(&login(&router, "alice", "s3cret").await);
        let req = Request::builder()
            .method("POST")
            .uri("/api/add_todo_list_item")
            .header("content-type", "application/x-www-form-urlencoded")
            .header(header::COOKIE, &cookie)
            .body(Body::from("{\"item\":\"sleep\"}"))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = router
            .oneshot(get_req("/api/get_todo_list_items", Some(&cookie)))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["items"][0]["item_value"], "sleep");
        assert_eq!(json["items"][0]["category"], DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn invalid_item_is_bad_request() {
        let router = build_router(state().await);
        let cookie = session_cookie(&login(&router, "alice", "s3cret").await);
        let resp = router
            .oneshot(post_json(
                "/api/add_todo_list_item",
                Some(&cookie),
                "{\"item_value\":\"   \",\"category\":\"red\"}",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["error"]["code"], "invalid_item");
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let router = build_router(state().await);
        let cookie = session_cookie(&login(&router, "alice", "s3cret").await);
        let resp = router
            .clone()
            .oneshot(get_req("/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login");
        let cleared = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .find(|v| v.starts_with(AUTH_COOKIE))
            .expect("removal cookie");
        assert!(cleared.contains("Max-Age=0"), "{cleared}");
    }

    #[tokio::test]
    async fn static_assets_are_cached() {
        let router = build_router(state().await);
        let resp = router
            .clone()
            .oneshot(get_req("/static/todo_list.js", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );

        let resp = router.oneshot(get_req("/login", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("login"));
    }
}
