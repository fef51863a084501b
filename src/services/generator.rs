//! Content generation: one completion call, then length validation.
//!
//! Never retries and never truncates.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::llm::{ChatMessage, CompletionClient, CompletionRequest};
use super::prompt::Prompt;
use crate::constants::MAX_POST_CHARS;
use crate::error::PipelineError;

/// Validated post text: trimmed, non-empty and within the platform limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText(String);

impl GeneratedText {
    /// Trim and validate. The error carries the rendered character count.
    pub fn parse(raw: &str) -> Result<Self, usize> {
        // Models like to wrap the whole answer in quotes
        Self::verbatim(strip_wrapping_quotes(raw.trim()))
    }

    /// Trim and validate without touching quotes, for operator-written text
    pub fn verbatim(raw: &str) -> Result<Self, usize> {
        let text = raw.trim();
        let length = text.chars().count();
        if length == 0 || length > MAX_POST_CHARS {
            return Err(length);
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn strip_wrapping_quotes(s: &str) -> &str {
    for (open, close) in [('"', '"'), ('“', '”')] {
        if s.chars().count() >= 2 && s.starts_with(open) && s.ends_with(close) {
            let inner = &s[open.len_utf8()..s.len() - close.len_utf8()];
            if !inner.contains(open) && !inner.contains(close) {
                return inner;
            }
        }
    }
    s
}

/// Tunable sampling parameters for the completion call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 150,
            temperature: 0.8,
            top_p: 0.9,
        }
    }
}

#[derive(Clone)]
pub struct ContentGenerator {
    client: Arc<dyn CompletionClient>,
    settings: GenerationSettings,
}

impl ContentGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// One completion call, no retry. The reply is trimmed, and one pair of
    /// wrapping quotes (straight or curly) is removed when the inner text has
    /// no quotes of its own. The 1..=280 character check runs on the result,
    /// so the returned text can differ from the raw model output.
    #[instrument(skip(self, prompt), fields(model = %self.settings.model))]
    pub async fn generate(&self, event_id: i64, prompt: &Prompt) -> Result<GeneratedText, PipelineError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(prompt.system.clone()),
                ChatMessage::user(prompt.user.clone()),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
        };

        let raw = self.client.complete(&request).await?;

        match GeneratedText::parse(&raw) {
            Ok(text) => {
                debug!(length = text.char_len(), "Generated post text");
                Ok(text)
            }
            Err(length) => {
                warn!(length, "Generated text failed validation");
                Err(PipelineError::GenerationValidation { event_id, length })
            }
        }
    }
}
