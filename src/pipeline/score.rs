//! Score extraction from joined page feedback.
//!
//! The model is asked to start each answer with `SCORE: X/<max>`, but nothing
//! guarantees it does. The first score-shaped token anywhere in the joined
//! text wins; when there is none the score is [`SCORE_NOT_FOUND`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator placed between page feedback segments.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Score recorded when no page produced a score line.
pub const SCORE_NOT_FOUND: &str = "Not found";

static RE_SCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)SCORE:\s*(\d+\.?\d*\s*/\s*\d+\.?\d*)").unwrap());

/// Join per-page feedback in page order.
pub fn join_feedback<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Return the first `x/y` score in `text`, or [`SCORE_NOT_FOUND`].
///
/// Whitespace inside the token is kept as the model wrote it
/// (`"SCORE: 7 / 10"` → `"7 / 10"`).
pub fn extract_score(text: &str) -> String {
    RE_SCORE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| SCORE_NOT_FOUND.to_string())
}
