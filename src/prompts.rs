//! Rubric prompt sent alongside every page image.
//!
//! The score line format requested here (`SCORE: X/<max>`) is the same shape
//! [`crate::pipeline::score::extract_score`] searches for. Changing one
//! without the other silently turns every result into `"Not found"`.

/// Build the grading prompt for one page.
///
/// `max_score` is inserted verbatim: it comes straight from the upload form
/// and is not validated as a number.
pub fn grading_prompt(max_score: &str) -> String {
    format!(
        r#"
    You are an AI teaching assistant evaluating a handwritten answer. The maximum score is {max}.
    Please provide your evaluation in the following structure:
    1.  **Score**: Start with the score in the format 'SCORE: X/{max}'.
    2.  **Feedback**: Provide a brief analysis of the student's mistakes and suggest areas for improvement in just 10 words
    "#,
        max = max_score
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_max_score_twice() {
        let p = grading_prompt("25");
        assert!(p.contains("The maximum score is 25."));
        assert!(p.contains("'SCORE: X/25'"));
    }

    #[test]
    fn prompt_keeps_non_numeric_max_verbatim() {
        let p = grading_prompt("ten");
        assert!(p.contains("SCORE: X/ten"));
    }
}
