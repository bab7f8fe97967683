//! HTTP surface: routes, sessions, and the shared application state.
//!
//! ```text
//! GET  /           → redirect /dashboard
//! GET  /register   sign-up / sign-in page
//! POST /register   action=register | action=login
//! GET  /dashboard  upload form
//! POST /dashboard  multipart upload → grade → report row
//! GET  /report     CSV download            (login required)
//! GET  /logout     end the session         (login required)
//! GET  /static/*   files under the static dir
//! ```

pub mod flash;
pub mod guards;
pub mod handlers;
pub mod templates;

use crate::config::AppConfig;
use crate::error::GraderError;
use crate::pipeline::llm::PageGrader;
use crate::pipeline::render::Rasterizer;
use crate::report::ReportStore;
use crate::store::sessions::SessionBackend;
use crate::store::CredentialStore;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use templates::Templates;
use tower_http::services::ServeDir;
use tower_sessions::{cookie::Key, SessionManagerLayer};

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: CredentialStore,
    /// Session records; on the credential pool when it is available.
    pub sessions: SessionBackend,
    pub reports: ReportStore,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub grader: Arc<dyn PageGrader>,
    pub templates: Arc<Templates>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        credentials: CredentialStore,
        rasterizer: Arc<dyn Rasterizer>,
        grader: Arc<dyn PageGrader>,
    ) -> Result<Self, GraderError> {
        Ok(Self {
            reports: ReportStore::new(config.report_path.clone()),
            config: Arc::new(config),
            sessions: SessionBackend::for_credentials(&credentials),
            credentials,
            rasterizer,
            grader,
            templates: Arc::new(Templates::load()?),
        })
    }
}

/// 64-byte cookie signing key derived from the configured secret.
fn signing_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let sessions = SessionManagerLayer::new(state.sessions.clone())
        .with_secure(false)
        .with_signed(signing_key(&state.config.secret_key));

    let guarded = Router::new()
        .route("/report", get(handlers::report))
        .route("/logout", get(handlers::logout))
        .route_layer(middleware::from_fn(guards::require_login));

    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register_submit),
        )
        .route(
            "/dashboard",
            get(handlers::dashboard).post(handlers::upload),
        )
        .merge(guarded)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(middleware::from_fn(guards::log_request))
        .layer(sessions)
        .with_state(state)
}
