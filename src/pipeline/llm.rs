//! VLM interaction: grade one page image against the rubric prompt.
//!
//! [`PageGrader`] is the seam between the pipeline and the outside world.
//! [`VisionGrader`] implements it on top of an `edgequake_llm` provider; tests
//! substitute a scripted grader so no network access is needed.
//!
//! ## Failure Policy
//!
//! A grader never returns an error. A failed call becomes
//! [`EVALUATION_ERROR`] and an empty response becomes
//! [`EVALUATION_UNAVAILABLE`], so one unreadable page still leaves the other
//! pages' feedback in the report.

use crate::config::AppConfig;
use crate::error::GraderError;
use crate::pipeline::encode::encode_page;
use crate::prompts::grading_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Feedback recorded when the model call fails.
pub const EVALUATION_ERROR: &str = "Error evaluating image";

/// Feedback recorded when the model answers with no text.
pub const EVALUATION_UNAVAILABLE: &str = "Evaluation not available.";

/// Grades one page image and returns the model's raw feedback text.
#[async_trait]
pub trait PageGrader: Send + Sync {
    async fn grade(&self, page_num: usize, image: &DynamicImage, max_score: &str) -> String;
}

/// [`PageGrader`] backed by a vision-capable `edgequake_llm` provider.
pub struct VisionGrader {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl VisionGrader {
    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Create the configured provider (`config.provider_name` / `config.model`).
    ///
    /// The provider reads its API key from the environment
    /// (`GEMINI_API_KEY` for `gemini`).
    pub fn from_config(config: &AppConfig) -> Result<Self, GraderError> {
        let provider = ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
            .map_err(|e| GraderError::ProviderNotConfigured {
                provider: config.provider_name.clone(),
                hint: format!("{e}"),
            })?;
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl PageGrader for VisionGrader {
    /// ## Message Layout
    ///
    /// A single user turn carrying the rubric prompt as text and the page PNG
    /// as an image attachment.
    async fn grade(&self, page_num: usize, image: &DynamicImage, max_score: &str) -> String {
        let start = Instant::now();

        let image_data = match encode_page(image) {
            Ok(data) => data,
            Err(e) => {
                warn!("Page {}: image encoding failed: {}", page_num, e);
                return EVALUATION_ERROR.to_string();
            }
        };

        let prompt = grading_prompt(max_score);
        let messages = vec![ChatMessage::user_with_images(
            prompt.as_str(),
            vec![image_data],
        )];

        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "Page {}: {} input tokens, {} output tokens, {:?}",
                    page_num,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                feedback_or_unavailable(response.content)
            }
            Err(e) => {
                warn!("Error evaluating image (page {}): {}", page_num, e);
                EVALUATION_ERROR.to_string()
            }
        }
    }
}

/// Map an empty model answer to the "not available" sentinel.
fn feedback_or_unavailable(content: String) -> String {
    if content.trim().is_empty() {
        EVALUATION_UNAVAILABLE.to_string()
    } else {
        content
    }
}

/// Build `CompletionOptions` from the app config.
fn build_options(config: &AppConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
