//! In-memory fakes for the pipeline's collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use autopost::domain::{
    Event, EventKind, EventRow, NewAttemptLog, NewPostRecord, PersonaProfile, PostType, ThemeRow,
};
use autopost::scheduler::{DueCandidates, PostedRefs, ScheduleSource};
use autopost::services::db::{AttemptSession, AttemptStore};
use autopost::services::generator::{ContentGenerator, GenerationSettings};
use autopost::services::llm::{CompletionClient, CompletionError, CompletionRequest};
use autopost::services::pipeline::Pipeline;
use autopost::services::prompt::PromptComposer;
use autopost::services::publisher::Publisher;
use autopost::services::twitter::{PostingClient, PublishError};

pub const STATUS_URL_BASE: &str = "https://x.com/i/web/status";

pub fn launch_day() -> Event {
    Event {
        id: 42,
        user_id: 1,
        kind: EventKind::Calendar,
        title: "Launch Day".to_string(),
        date: None,
        description: None,
        tags: Vec::new(),
    }
}

// ============================================================================
// Language model
// ============================================================================

pub enum Reply {
    Text(String),
    Status(u16),
    /// Never answers
    Hang,
}

pub struct FakeCompletion {
    reply: Reply,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletion {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn text(text: &str) -> Arc<Self> {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Status(status) => Err(CompletionError::Api {
                status: *status,
                body: "upstream error".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

// ============================================================================
// Platform
// ============================================================================

pub struct FakePoster {
    fail_with: Option<String>,
    /// When set, the post call signals `started` and waits for `release`
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
}

impl FakePoster {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail_with: None,
            gate: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(message.to_string()),
            gate: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn gated(started: Arc<Notify>, release: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            fail_with: None,
            gate: Some((started, release)),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostingClient for FakePoster {
    async fn create_post(&self, text: &str) -> Result<String, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());

        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        match &self.fail_with {
            Some(message) => Err(PublishError::Network(message.clone())),
            None => Ok("999".to_string()),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Default)]
pub struct Writes {
    pub sessions: usize,
    /// Table names in write order
    pub order: Vec<&'static str>,
    pub posts: Vec<NewPostRecord>,
    pub logs: Vec<NewAttemptLog>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub writes: Arc<Mutex<Writes>>,
    pub fail_post: bool,
    pub fail_log: bool,
}

impl MemoryStore {
    pub fn failing_posts() -> Self {
        Self {
            fail_post: true,
            ..Self::default()
        }
    }

    pub fn failing_logs() -> Self {
        Self {
            fail_log: true,
            ..Self::default()
        }
    }

    pub fn post_count(&self) -> usize {
        self.writes.lock().unwrap().posts.len()
    }

    pub fn log_count(&self) -> usize {
        self.writes.lock().unwrap().logs.len()
    }
}

pub struct MemorySession(MemoryStore);

#[async_trait]
impl AttemptSession for MemorySession {
    async fn insert_post(&mut self, post: &NewPostRecord) -> Result<i64, sqlx::Error> {
        if self.0.fail_post {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut writes = self.0.writes.lock().unwrap();
        writes.order.push("posts");
        writes.posts.push(post.clone());
        Ok(100 + writes.posts.len() as i64)
    }

    async fn insert_log(&mut self, log: &NewAttemptLog) -> Result<i64, sqlx::Error> {
        if self.0.fail_log {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut writes = self.0.writes.lock().unwrap();
        writes.order.push("post_logs");
        writes.logs.push(log.clone());
        Ok(writes.logs.len() as i64)
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    type Session = MemorySession;

    async fn session(&self) -> Result<MemorySession, sqlx::Error> {
        self.writes.lock().unwrap().sessions += 1;
        Ok(MemorySession(self.clone()))
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// Fixed candidates; "already posted" is answered from the store's post rows
/// with the same rules the Postgres queries apply
pub struct MemorySchedule {
    pub candidates: DueCandidates,
    pub store: MemoryStore,
}

#[async_trait]
impl ScheduleSource for MemorySchedule {
    async fn candidates(&self, _date: NaiveDate, _time: NaiveTime) -> Result<DueCandidates, sqlx::Error> {
        Ok(self.candidates.clone())
    }

    async fn posted(
        &self,
        candidates: &DueCandidates,
        day: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<PostedRefs, sqlx::Error> {
        let (since, until) = day;
        let writes = self.store.writes.lock().unwrap();
        let mut refs = PostedRefs::default();
        for post in &writes.posts {
            let Some(event_ref) = post.event_ref else {
                continue;
            };
            match post.post_type {
                PostType::Event if candidates.events.iter().any(|row| row.id == event_ref) => {
                    refs.events.insert(event_ref);
                }
                PostType::Theme
                    if candidates.themes.iter().any(|row| row.id == event_ref)
                        && since <= post.scheduled_at
                        && post.scheduled_at < until =>
                {
                    refs.themes.insert(event_ref);
                }
                _ => {}
            }
        }
        Ok(refs)
    }

    async fn persona(&self, _owner_id: i64) -> Result<Option<PersonaProfile>, sqlx::Error> {
        Ok(None)
    }
}

pub fn calendar_row(id: i64, on: NaiveDate) -> EventRow {
    EventRow {
        id,
        user_id: 1,
        title: "Launch Day".to_string(),
        event_date: on,
        description: None,
        tags: Vec::new(),
    }
}

pub fn theme_row(id: i64) -> ThemeRow {
    ThemeRow {
        id,
        user_id: 1,
        weekday: 0,
        post_time: NaiveTime::MIN,
        theme: "Motivation Monday".to_string(),
        description: None,
        tags: Vec::new(),
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn pipeline(
    completion: Arc<FakeCompletion>,
    poster: Arc<FakePoster>,
    store: MemoryStore,
) -> Pipeline<MemoryStore> {
    Pipeline::new(
        PromptComposer::default(),
        ContentGenerator::new(completion, GenerationSettings::default()),
        Publisher::new(poster, STATUS_URL_BASE),
        store,
    )
}
