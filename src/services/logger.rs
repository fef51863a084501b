//! Attempt logging
//!
//! Writes the post row, then the attempt log row that references it, on one
//! session. If the post insert fails the log insert is never attempted.
//! No transaction: a post row that made it to disk stays as the trace of the
//! attempt even when the log insert fails.

use chrono::Utc;
use tracing::{debug, error, instrument};

use super::db::{AttemptSession, AttemptStore};
use super::publisher::PublicationOutcome;
use crate::domain::{NewAttemptLog, NewPostRecord, PostStatus, PostType};
use crate::error::PipelineError;

/// Model name recorded for operator-written posts
pub const MANUAL_MODEL: &str = "manual";

/// Who or what an attempt was about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSubject {
    pub owner_id: i64,
    pub post_type: PostType,
    pub event_ref: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorship {
    Generated,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedAttempt {
    pub post_id: i64,
    pub log_id: i64,
}

pub struct AttemptLogger<S> {
    store: S,
    model: String,
}

impl<S: AttemptStore> AttemptLogger<S> {
    pub fn new(store: S, model: &str) -> Self {
        Self {
            store,
            model: model.to_string(),
        }
    }

    #[instrument(skip_all, fields(owner_id = subject.owner_id, post_type = %subject.post_type, success = outcome.success()))]
    pub async fn record(
        &self,
        subject: &AttemptSubject,
        text: &str,
        outcome: &PublicationOutcome,
        authorship: Authorship,
    ) -> Result<PersistedAttempt, PipelineError> {
        let persistence_error = |post_id: Option<i64>, source: sqlx::Error| {
            error!(
                ?post_id,
                external_id = outcome.external_id(),
                error = %source,
                "Attempt could not be persisted; platform state and local records may disagree"
            );
            PipelineError::Persistence {
                post_id,
                external_id: outcome.external_id().map(str::to_string),
                source,
            }
        };

        let mut session = self
            .store
            .session()
            .await
            .map_err(|e| persistence_error(None, e))?;

        let now = Utc::now();
        let post = NewPostRecord {
            user_id: subject.owner_id,
            content: text.to_string(),
            status: PostStatus::from_success(outcome.success()),
            post_type: subject.post_type,
            event_ref: subject.event_ref,
            scheduled_at: now,
        };

        let post_id = session
            .insert_post(&post)
            .await
            .map_err(|e| persistence_error(None, e))?;

        let (model, ai_generated) = match authorship {
            Authorship::Generated => (self.model.clone(), true),
            Authorship::Manual => (MANUAL_MODEL.to_string(), false),
        };

        let log = NewAttemptLog {
            user_id: subject.owner_id,
            post_id,
            post_type: subject.post_type,
            event_ref: subject.event_ref,
            content: text.to_string(),
            x_post_id: outcome.external_id().unwrap_or_default().to_string(),
            success: outcome.success(),
            error: outcome.error().map(str::to_string),
            model,
            ai_generated,
            created_at: now,
        };

        let log_id = session
            .insert_log(&log)
            .await
            .map_err(|e| persistence_error(Some(post_id), e))?;

        debug!(post_id, log_id, "Recorded attempt");
        Ok(PersistedAttempt { post_id, log_id })
    }
}
