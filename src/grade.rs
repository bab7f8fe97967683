//! Grading entry point: one uploaded PDF in, one [`Evaluation`] out.
//!
//! Pages are graded strictly one after another. Each page is a separate
//! model call and its feedback is kept in page order, so the joined text in
//! the report reads top to bottom like the answer sheet.

use crate::error::GraderError;
use crate::pipeline::llm::PageGrader;
use crate::pipeline::render::{self, Rasterizer};
use crate::pipeline::{input, score};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of grading one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// First score token found in the feedback, or `"Not found"`.
    pub score: String,
    /// All page feedback joined with [`score::PAGE_SEPARATOR`].
    pub feedback: String,
    /// Raw feedback per page, in document order.
    pub pages: Vec<String>,
}

/// Rasterise `pdf`, grade every page against `max_score`, and extract the score.
///
/// # Errors
/// Only fatal conditions abort: the bytes are not a PDF, pdfium cannot open
/// or render it, or it has no pages. A page the model could not grade
/// contributes its sentinel feedback instead.
pub async fn grade_submission(
    rasterizer: Arc<dyn Rasterizer>,
    grader: &dyn PageGrader,
    pdf: Vec<u8>,
    max_score: &str,
) -> Result<Evaluation, GraderError> {
    let total_start = Instant::now();

    // ── Step 1: Validate input ───────────────────────────────────────────
    input::check_pdf_magic(&pdf)?;

    // ── Step 2: Rasterise pages ──────────────────────────────────────────
    let render_start = Instant::now();
    let images = render::render_pages(rasterizer, pdf).await?;
    if images.is_empty() {
        return Err(GraderError::NoPages);
    }
    info!(
        "Rendered {} pages in {}ms",
        images.len(),
        render_start.elapsed().as_millis()
    );

    // ── Step 3: Grade each page sequentially ─────────────────────────────
    let mut pages = Vec::with_capacity(images.len());
    for (idx, image) in images.iter().enumerate() {
        let feedback = grader.grade(idx + 1, image, max_score).await;
        debug!("Page {}: {} chars of feedback", idx + 1, feedback.len());
        pages.push(feedback);
    }

    // ── Step 4: Join and extract ─────────────────────────────────────────
    let feedback = score::join_feedback(&pages);
    let score = score::extract_score(&feedback);

    info!(
        "Graded {} pages in {}ms, score: {}",
        pages.len(),
        total_start.elapsed().as_millis(),
        score
    );

    Ok(Evaluation {
        score,
        feedback,
        pages,
    })
}
