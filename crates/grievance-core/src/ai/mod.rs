//! Text generation backends
//!
//! Action plans and executive summaries can be drafted by an external
//! text generator. This module defines the seam such a generator plugs
//! into; the crate itself ships only [`MockBackend`].
//!
//! Generated text never feeds back into classification or breakdowns.
//! Responses are parsed and validated in [`parsing`] and callers fall back
//! to deterministic templates on any failure.

pub mod mock;
pub mod parsing;

pub use mock::MockBackend;
pub use parsing::GeneratedPlan;

use crate::error::Result;
use crate::prompts::PromptId;

/// One call to a text generator
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    /// Which template produced the prompt
    pub prompt_id: PromptId,
    /// Fully rendered prompt text
    pub prompt: String,
    /// Structured data the prompt was rendered from
    pub data: &'a serde_json::Value,
}

/// Trait for text generation backends
pub trait TextBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Generate raw response text for a request
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;
}
