//! Publication with contained failure.
//!
//! `publish` never returns an error: a failed platform call becomes
//! [`PublicationOutcome::Failed`] so the attempt still reaches logging.
//! Exactly one platform call per invocation, no retries.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::twitter::PostingClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationOutcome {
    Posted { external_id: String, url: String },
    Failed { message: String },
}

impl PublicationOutcome {
    pub fn success(&self) -> bool {
        matches!(self, PublicationOutcome::Posted { .. })
    }

    pub fn external_id(&self) -> Option<&str> {
        match self {
            PublicationOutcome::Posted { external_id, .. } => Some(external_id),
            PublicationOutcome::Failed { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            PublicationOutcome::Posted { url, .. } => Some(url),
            PublicationOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PublicationOutcome::Posted { .. } => None,
            PublicationOutcome::Failed { message } => Some(message),
        }
    }
}

#[derive(Clone)]
pub struct Publisher {
    client: Arc<dyn PostingClient>,
    status_url_base: String,
}

impl Publisher {
    /// `status_url_base` is joined with the post id, e.g. `https://x.com/i/web/status`
    pub fn new(client: Arc<dyn PostingClient>, status_url_base: &str) -> Self {
        Self {
            client,
            status_url_base: status_url_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn status_url(&self, external_id: &str) -> String {
        format!("{}/{}", self.status_url_base, external_id)
    }

    #[instrument(skip_all, fields(length = text.chars().count()))]
    pub async fn publish(&self, text: &str) -> PublicationOutcome {
        match self.client.create_post(text).await {
            Ok(external_id) => {
                let url = self.status_url(&external_id);
                info!(%external_id, "Published post");
                PublicationOutcome::Posted { external_id, url }
            }
            Err(e) => {
                warn!(error = %e, "Publication failed");
                PublicationOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::twitter::PublishError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakePoster {
        fail_with: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PostingClient for FakePoster {
        async fn create_post(&self, _text: &str) -> Result<String, PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(msg) => Err(PublishError::Network(msg.clone())),
                None => Ok("999".to_string()),
            }
        }
    }

    #[tokio::test]
    async fn success_derives_url_from_external_id() {
        let poster = Arc::new(FakePoster {
            fail_with: None,
            calls: AtomicUsize::new(0),
        });
        let publisher = Publisher::new(poster.clone(), "https://x.com/i/web/status/");

        let outcome = publisher.publish("hello").await;
        assert!(outcome.success());
        assert_eq!(outcome.external_id(), Some("999"));
        assert_eq!(outcome.url(), Some("https://x.com/i/web/status/999"));
        assert_eq!(outcome.error(), None);
        assert_eq!(poster.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_contained_and_not_retried() {
        let poster = Arc::new(FakePoster {
            fail_with: Some("timeout".into()),
            calls: AtomicUsize::new(0),
        });
        let publisher = Publisher::new(poster.clone(), "https://x.com/i/web/status");

        let outcome = publisher.publish("hello").await;
        assert!(!outcome.success());
        assert_eq!(outcome.external_id(), None);
        assert_eq!(outcome.url(), None);
        assert_eq!(outcome.error(), Some("timeout"));
        assert_eq!(poster.calls.load(Ordering::SeqCst), 1);
    }
}
