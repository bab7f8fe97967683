//! Error types for the edgequake-grader library.
//!
//! Three error types follow the three places a request can go wrong:
//!
//! * [`GraderError`]: **fatal for one submission**, such as an upload that is
//!   not a PDF or a report that could not be written. The web layer catches
//!   it and flashes `"Error: …"`; the process keeps serving.
//!
//! * [`ReportError`]: the CSV report could not be read or rewritten.
//!
//! * [`AuthError`]: the credential store rejected or could not run an
//!   operation. Callers log it; none of these reach the user verbatim.
//!
//! A failed model call for a single page is *not* an error here: the grading
//! client turns it into a sentinel feedback string so the remaining pages
//! are still graded.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors for a single grading submission.
#[derive(Debug, Error)]
pub enum GraderError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The uploaded bytes do not start with the `%PDF` magic.
    #[error("Uploaded file is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The upload could not be stored under the upload directory.
    #[error("Failed to save upload '{path}': {source}")]
    UploadWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// The PDF opened but contains no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// Appending the submission to the CSV report failed.
    #[error("Failed to update report: {0}")]
    Report(#[from] ReportError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured vision provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the CSV report store.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report file '{path}' is not valid CSV: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Errors raised by the credential store and password hashing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No database connection was established at startup.
    #[error("credential store is unavailable")]
    Unavailable,

    /// The `users.email` unique constraint rejected the insert.
    #[error("a user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_pdf_display() {
        let e = GraderError::NotAPdf {
            magic: b"PK\x03\x04".to_vec(),
        };
        assert!(e.to_string().contains("not a valid PDF"), "got: {e}");
    }

    #[test]
    fn report_error_converts_into_grader_error() {
        let e: GraderError = ReportError::Io {
            path: PathBuf::from("student_scores.csv"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        let msg = e.to_string();
        assert!(msg.starts_with("Failed to update report"), "got: {msg}");
        assert!(msg.contains("student_scores.csv"));
    }

    #[test]
    fn rasterisation_display_names_page() {
        let e = GraderError::RasterisationFailed {
            page: 3,
            detail: "bitmap alloc".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn duplicate_email_display() {
        let e = AuthError::DuplicateEmail("ada@example.com".into());
        assert!(e.to_string().contains("ada@example.com"));
    }
}
