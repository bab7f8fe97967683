//! # edgequake-grader
//!
//! Grade scanned, handwritten answer sheets with a Vision Language Model and
//! keep the results in a CSV report.
//!
//! An instructor uploads a PDF of one student's answers together with the
//! maximum score. Each page is rasterised, sent to the model with a fixed
//! rubric prompt, and the per-page feedback is joined into one text. The
//! first `SCORE: x/y` token in that text becomes the student's score.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Input   save under the upload dir, check the %PDF magic
//!  ├─ 2. Render  rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode  PNG → base64 ImageData
//!  ├─ 4. VLM     one grading call per page, in page order
//!  ├─ 5. Score   join feedback, extract the first SCORE: x/y
//!  └─ 6. Report  append a row to student_scores.csv
//! ```
//!
//! ## Library Use
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use edgequake_grader::{grade_submission, AppConfig};
//! use edgequake_grader::pipeline::llm::VisionGrader;
//! use edgequake_grader::pipeline::render::PdfiumRasterizer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::builder().api_key("…").build()?;
//!     let grader = VisionGrader::from_config(&config)?;
//!     let rasterizer = Arc::new(PdfiumRasterizer::new(None, config.max_rendered_pixels));
//!
//!     let pdf = std::fs::read("answers.pdf")?;
//!     let eval = grade_submission(rasterizer, &grader, pdf, "10").await?;
//!     println!("{}\n\n{}", eval.score, eval.feedback);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `grader` server binary (clap + anyhow + dotenvy + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod config;
pub mod error;
pub mod grade;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod store;
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use auth::SessionUser;
pub use config::{AppConfig, AppConfigBuilder};
pub use error::{AuthError, GraderError, ReportError};
pub use grade::{grade_submission, Evaluation};
pub use report::{ReportStore, SubmissionRecord};
pub use store::CredentialStore;
pub use web::{router, AppState};
