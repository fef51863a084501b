//! Post and attempt log model definitions

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::event::PostType;

/// Outcome recorded on a post row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Posted,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Posted => "posted",
            PostStatus::Failed => "failed",
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            PostStatus::Posted
        } else {
            PostStatus::Failed
        }
    }
}

/// Post row to insert, one per attempt
#[derive(Debug, Clone)]
pub struct NewPostRecord {
    pub user_id: i64,
    pub content: String,
    pub status: PostStatus,
    pub post_type: PostType,
    pub event_ref: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
}

/// Attempt log row to insert, referencing an already written post
#[derive(Debug, Clone)]
pub struct NewAttemptLog {
    pub user_id: i64,
    pub post_id: i64,
    pub post_type: PostType,
    pub event_ref: Option<i64>,
    pub content: String,
    /// Empty when nothing was published
    pub x_post_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub model: String,
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
}

/// A stored post
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub status: String,
    pub post_type: String,
    pub event_ref: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
}

/// A stored attempt log entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AttemptLogRecord {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub post_type: String,
    pub event_ref: Option<i64>,
    pub content: String,
    pub x_post_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub model: String,
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
}
