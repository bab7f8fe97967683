//! Route handlers.
//!
//! Every POST ends in a redirect (post/redirect/get). Outcomes reach the user
//! only through flashes, so a handler never returns an error status for a
//! failed grading or a failed login.

use crate::auth::{self, SessionUser};
use crate::error::{AuthError, GraderError};
use crate::grade::{grade_submission, Evaluation};
use crate::pipeline::input::save_upload;
use crate::report::SubmissionRecord;
use crate::web::flash::{self, FlashLevel};
use crate::web::guards::{current_user, SESSION_USER_KEY};
use crate::web::templates::{DASHBOARD_PAGE, REGISTER_PAGE};
use crate::web::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tera::Context;
use tokio_util::io::ReaderStream;
use tower_sessions::Session;
use tracing::{debug, error, info, warn};

pub const REGISTERED: &str = "Registration successful! You can now log in.";
pub const LOGGED_IN: &str = "Login successful!";
pub const BAD_CREDENTIALS: &str = "Invalid email or password!";
pub const LOGGED_OUT: &str = "Logged out successfully!";
pub const FIELDS_REQUIRED: &str = "All fields are required!";

/// Download name of the report, whatever the file is called on disk.
pub const REPORT_DOWNLOAD_NAME: &str = "student_scores.csv";

fn render(state: &AppState, page: &str, flashes: &[flash::Flash], ctx: Context) -> Response {
    match state.templates.render(page, flashes, ctx) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Rendering {} failed: {:?}", page, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

pub async fn home() -> Redirect {
    Redirect::to("/dashboard")
}

// ── Register / login ─────────────────────────────────────────────────────

pub async fn register_page(State(state): State<AppState>, session: Session) -> Response {
    let flashes = flash::take(&session).await;
    render(&state, REGISTER_PAGE, &flashes, Context::new())
}

/// Body of `POST /register`. `action` picks between the two forms on the page.
#[derive(Debug, Default, Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AuthForm>,
) -> Redirect {
    match form.action.as_str() {
        "register" => {
            match auth::register(&state.credentials, &form.name, &form.email, &form.password).await {
                Ok(_) => flash::push(&session, FlashLevel::Success, REGISTERED).await,
                Err(AuthError::DuplicateEmail(_)) => {
                    warn!("Registration rejected: email already registered");
                }
                Err(e) => error!("Registration failed: {}", e),
            }
        }
        "login" => match auth::login(&state.credentials, &form.email, &form.password).await {
            Ok(Some(user)) => {
                if start_session(&session, &user).await {
                    flash::push(&session, FlashLevel::Success, LOGGED_IN).await;
                    return Redirect::to("/dashboard");
                }
            }
            Ok(None) => flash::push(&session, FlashLevel::Danger, BAD_CREDENTIALS).await,
            Err(e) => error!("Login failed: {}", e),
        },
        other => debug!(action = other, "Ignoring unknown register action"),
    }
    Redirect::to("/register")
}

async fn start_session(session: &Session, user: &SessionUser) -> bool {
    if let Err(e) = session.cycle_id().await {
        warn!("Could not rotate session id: {}", e);
    }
    match session.insert(SESSION_USER_KEY, user).await {
        Ok(()) => true,
        Err(e) => {
            error!("Could not store user in session: {}", e);
            false
        }
    }
}

pub async fn logout(Extension(user): Extension<SessionUser>, session: Session) -> Redirect {
    if let Err(e) = session.remove::<SessionUser>(SESSION_USER_KEY).await {
        warn!("Could not clear session user: {}", e);
    }
    if let Err(e) = session.cycle_id().await {
        warn!("Could not rotate session id: {}", e);
    }
    info!(user_id = user.id, "User logged out");
    flash::push(&session, FlashLevel::Success, LOGGED_OUT).await;
    Redirect::to("/register")
}

// ── Dashboard ────────────────────────────────────────────────────────────

pub async fn dashboard(State(state): State<AppState>, session: Session) -> Response {
    let user = current_user(&session).await;
    let flashes = flash::take(&session).await;

    let mut ctx = Context::new();
    ctx.insert("name", user.as_ref().map_or("Guest", |u| u.name.as_str()));
    ctx.insert("logged_in", &user.is_some());
    render(&state, DASHBOARD_PAGE, &flashes, ctx)
}

/// Raw multipart fields of the upload form. Every field is optional here so
/// that a missing one is reported as a flash rather than a 400.
#[derive(Debug, Default)]
struct UploadForm {
    name: Option<String>,
    class_section: Option<String>,
    roll_no: Option<String>,
    user_score: Option<String>,
    filename: Option<String>,
    pdf: Bytes,
}

/// An upload with every field present.
#[derive(Debug)]
struct Submission {
    name: String,
    class_section: String,
    roll_no: String,
    max_score: String,
    filename: String,
    pdf: Bytes,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, axum::extract::multipart::MultipartError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_owned();
            match field_name.as_str() {
                "pdf_file" => {
                    form.filename = field.file_name().map(str::to_owned);
                    form.pdf = field.bytes().await?;
                }
                "name" => form.name = Some(field.text().await?),
                "class_section" => form.class_section = Some(field.text().await?),
                "roll_no" => form.roll_no = Some(field.text().await?),
                "user_score" => form.user_score = Some(field.text().await?),
                other => debug!(field = other, "Ignoring unknown upload field"),
            }
        }
        Ok(form)
    }

    fn complete(self) -> Option<Submission> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        Some(Submission {
            name: present(self.name)?,
            class_section: present(self.class_section)?,
            roll_no: present(self.roll_no)?,
            max_score: present(self.user_score)?,
            filename: present(self.filename)?,
            pdf: self.pdf,
        })
    }
}

pub async fn upload(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Redirect {
    let form = match UploadForm::read(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Malformed upload: {}", e);
            flash::push(&session, FlashLevel::Danger, format!("Error: {e}")).await;
            return Redirect::to("/dashboard");
        }
    };

    let Some(submission) = form.complete() else {
        flash::push(&session, FlashLevel::Info, FIELDS_REQUIRED).await;
        return Redirect::to("/dashboard");
    };

    let roll_no = submission.roll_no.clone();
    match process_submission(&state, submission).await {
        Ok(eval) => {
            info!(roll_no = %roll_no, score = %eval.score, pages = eval.pages.len(), "Submission graded");
            flash::push(
                &session,
                FlashLevel::Success,
                format!("Evaluation Complete! Final Score: {}", eval.score),
            )
            .await;
        }
        Err(e) => {
            error!(roll_no = %roll_no, "Submission failed: {}", e);
            flash::push(&session, FlashLevel::Danger, format!("Error: {e}")).await;
        }
    }
    Redirect::to("/dashboard")
}

/// Save, grade, and record one submission.
async fn process_submission(state: &AppState, sub: Submission) -> Result<Evaluation, GraderError> {
    let saved = save_upload(&state.config.upload_dir, &sub.filename, &sub.pdf).await?;
    debug!("Saved upload to {}", saved.display());

    let eval = grade_submission(
        state.rasterizer.clone(),
        state.grader.as_ref(),
        sub.pdf.to_vec(),
        &sub.max_score,
    )
    .await?;

    let record = SubmissionRecord {
        name: sub.name,
        class_section: sub.class_section,
        roll_no: sub.roll_no,
        score: eval.score.clone(),
        feedback: eval.feedback.clone(),
    };
    let reports = state.reports.clone();
    tokio::task::spawn_blocking(move || reports.append(&record))
        .await
        .map_err(|e| GraderError::Internal(format!("report task panicked: {e}")))??;

    Ok(eval)
}

// ── Report ───────────────────────────────────────────────────────────────

pub async fn report(State(state): State<AppState>, Extension(user): Extension<SessionUser>) -> Response {
    let reports = state.reports.clone();
    match tokio::task::spawn_blocking(move || reports.ensure_initialized()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Report unavailable: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Report unavailable").into_response();
        }
        Err(e) => {
            error!("Report task panicked: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let file = match tokio::fs::File::open(state.reports.path()).await {
        Ok(file) => file,
        Err(e) => {
            error!("Opening {} failed: {}", state.reports.path().display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Report unavailable").into_response();
        }
    };

    info!(user_id = user.id, "Report downloaded");
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REPORT_DOWNLOAD_NAME}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}
