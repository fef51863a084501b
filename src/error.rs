//! Pipeline error taxonomy
//!
//! Compose and generate failures abort before anything is published or
//! written. Publication failures never appear here: they are carried as data
//! in [`PublicationOutcome`](crate::services::publisher::PublicationOutcome).

use thiserror::Error;

use crate::services::llm::CompletionError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The event cannot produce a meaningful prompt, or manual text is unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The language-model call itself failed
    #[error("language model request failed: {0}")]
    GenerationService(#[from] CompletionError),

    /// The model answered with empty or over-length text
    #[error("generated text for event {event_id} has invalid length {length}")]
    GenerationValidation { event_id: i64, length: usize },

    /// A durable write failed after the publish step ran
    #[error(
        "failed to persist attempt (post id {}, external id {}): {source}",
        .post_id.map(|id| id.to_string()).unwrap_or_else(|| "none".into()),
        .external_id.as_deref().unwrap_or("none")
    )]
    Persistence {
        post_id: Option<i64>,
        external_id: Option<String>,
        source: sqlx::Error,
    },

    /// The detached publish-and-log task panicked or was cancelled by the runtime
    #[error("publication task did not complete: {0}")]
    Aborted(String),

    /// The process is stopping; nothing was published
    #[error("pipeline is shutting down")]
    ShuttingDown,
}

impl PipelineError {
    /// True when a post may exist on the platform without a complete local record
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, PipelineError::Persistence { .. } | PipelineError::Aborted(_))
    }
}
