//! Request middleware: access logging and the login guard.

use crate::auth::SessionUser;
use crate::web::flash::{self, FlashLevel};
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::time::Instant;
use tower_sessions::Session;
use tracing::{info, warn};

/// Session key holding the logged-in [`SessionUser`].
pub const SESSION_USER_KEY: &str = "user";

pub const LOGIN_REQUIRED: &str = "Please log in to access this page.";

/// The logged-in user, if any.
pub async fn current_user(session: &Session) -> Option<SessionUser> {
    match session.get::<SessionUser>(SESSION_USER_KEY).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Could not read user from session: {}", e);
            None
        }
    }
}

/// Let the request through only with a logged-in session.
///
/// On success the [`SessionUser`] is put in the request extensions so the
/// handler can take it with `Extension<SessionUser>`. Otherwise the client
/// is sent to `/register` with a flash.
pub async fn require_login(session: Session, mut req: Request, next: Next) -> Response {
    match current_user(&session).await {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            info!(path = %req.uri().path(), "Anonymous request to guarded route");
            flash::push(&session, FlashLevel::Info, LOGIN_REQUIRED).await;
            Redirect::to("/register").into_response()
        }
    }
}

/// One line per request: method, path, status and latency.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}
