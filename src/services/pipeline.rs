//! Pipeline orchestration
//!
//! One attempt walks a linear state machine:
//!
//! ```text
//! Start -> Composed -> Generated -> (publish, log) -> Done
//! ```
//!
//! Compose and generate failures end the attempt with nothing published or
//! written. From `Generated` onward the publish call and the logging run on a
//! detached task: once a real post may be in flight, dropping the caller's
//! future does not stop it from being recorded. Those tasks are tracked so
//! [`Pipeline::shutdown`] can wait for them before the process exits.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, warn};

use super::db::AttemptStore;
use super::generator::{ContentGenerator, GeneratedText};
use super::logger::{AttemptLogger, AttemptSubject, Authorship};
use super::prompt::{Prompt, PromptComposer};
use super::publisher::{PublicationOutcome, Publisher};
use crate::constants::MAX_POST_CHARS;
use crate::domain::{Event, PersonaProfile, PostType};
use crate::error::PipelineError;

/// Caller-facing result; the JSON shape is relied on by the dashboard and scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub post_id: i64,
}

impl PipelineResult {
    fn from_outcome(post_id: i64, outcome: &PublicationOutcome) -> Self {
        Self {
            success: outcome.success(),
            tweet_id: outcome.external_id().map(str::to_string),
            tweet_url: outcome.url().map(str::to_string),
            error: outcome.error().map(str::to_string),
            post_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Composed,
    Generated,
    Done,
}

enum AttemptState {
    Start,
    Composed(Prompt),
    Generated(GeneratedText),
    Done(PipelineResult),
}

impl AttemptState {
    fn stage(&self) -> Stage {
        match self {
            AttemptState::Start => Stage::Start,
            AttemptState::Composed(_) => Stage::Composed,
            AttemptState::Generated(_) => Stage::Generated,
            AttemptState::Done(_) => Stage::Done,
        }
    }
}

pub struct Pipeline<S> {
    composer: PromptComposer,
    generator: ContentGenerator,
    publisher: Publisher,
    logger: Arc<AttemptLogger<S>>,
    tasks: TaskTracker,
}

impl<S: AttemptStore> Pipeline<S> {
    pub fn new(
        composer: PromptComposer,
        generator: ContentGenerator,
        publisher: Publisher,
        store: S,
    ) -> Self {
        let logger = Arc::new(AttemptLogger::new(store, generator.model()));
        Self {
            composer,
            generator,
            publisher,
            logger,
            tasks: TaskTracker::new(),
        }
    }

    /// Refuse new publications and wait for in-flight ones to be recorded
    pub async fn shutdown(&self) {
        self.tasks.close();
        if !self.tasks.is_empty() {
            info!(in_flight = self.tasks.len(), "Waiting for in-flight publications");
        }
        self.tasks.wait().await;
    }

    /// Produce and publish a post for `event`
    pub async fn run(
        &self,
        event: &Event,
        persona: Option<&PersonaProfile>,
    ) -> Result<PipelineResult, PipelineError> {
        let span = info_span!("attempt", event_id = event.id, owner_id = event.user_id, post_type = %event.post_type());
        async {
            if self.tasks.is_closed() {
                return Err(PipelineError::ShuttingDown);
            }
            let subject = AttemptSubject {
                owner_id: event.user_id,
                post_type: event.post_type(),
                event_ref: Some(event.id),
            };

            let mut state = AttemptState::Start;
            loop {
                debug!(stage = ?state.stage(), "Advancing attempt");
                state = match state {
                    AttemptState::Start => AttemptState::Composed(self.composer.compose(event, persona)?),
                    AttemptState::Composed(prompt) => {
                        AttemptState::Generated(self.generator.generate(event.id, &prompt).await?)
                    }
                    AttemptState::Generated(text) => AttemptState::Done(
                        self.publish_and_log(subject.clone(), text, Authorship::Generated)
                            .await?,
                    ),
                    AttemptState::Done(result) => return Ok(result),
                };
            }
        }
        .instrument(span)
        .await
    }

    /// Publish operator-written text, skipping composition and generation
    pub async fn run_manual(&self, owner_id: i64, text: &str) -> Result<PipelineResult, PipelineError> {
        let text = GeneratedText::verbatim(text).map_err(|length| {
            PipelineError::InvalidInput(format!(
                "post text must be 1 to {} characters, got {}",
                MAX_POST_CHARS, length
            ))
        })?;

        let subject = AttemptSubject {
            owner_id,
            post_type: PostType::Manual,
            event_ref: None,
        };

        self.publish_and_log(subject, text, Authorship::Manual)
            .instrument(info_span!("attempt", owner_id, post_type = %PostType::Manual))
            .await
    }

    async fn publish_and_log(
        &self,
        subject: AttemptSubject,
        text: GeneratedText,
        authorship: Authorship,
    ) -> Result<PipelineResult, PipelineError> {
        if self.tasks.is_closed() {
            return Err(PipelineError::ShuttingDown);
        }
        let publisher = self.publisher.clone();
        let logger = Arc::clone(&self.logger);

        let task = self.tasks.spawn(
            async move {
                let text = text.into_inner();
                let outcome = publisher.publish(&text).await;
                let saved = logger.record(&subject, &text, &outcome, authorship).await?;

                let result = PipelineResult::from_outcome(saved.post_id, &outcome);
                if result.success {
                    info!(post_id = result.post_id, tweet_id = ?result.tweet_id, "Attempt published");
                } else {
                    warn!(post_id = result.post_id, error = ?result.error, "Attempt recorded as failed");
                }
                Ok::<_, PipelineError>(result)
            }
            .in_current_span(),
        );

        task.await
            .map_err(|e| PipelineError::Aborted(e.to_string()))?
    }
}
