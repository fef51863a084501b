//! Event model definitions

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::fmt;

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A dated entry from the owner's calendar
    Calendar,
    /// A recurring weekly theme slot
    Theme,
}

/// Category recorded on posts and attempt logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Event,
    Theme,
    Manual,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Event => "event",
            PostType::Theme => "theme",
            PostType::Manual => "manual",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EventKind> for PostType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Calendar => PostType::Event,
            EventKind::Theme => PostType::Theme,
        }
    }
}

/// The subject a post is generated about. Read-only once loaded.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub user_id: i64,
    pub kind: EventKind,
    /// Required: prompt composition rejects a blank title
    pub title: String,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl Event {
    pub fn post_type(&self) -> PostType {
        self.kind.into()
    }
}

/// Row from `calendar_events`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub event_date: NaiveDate,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            kind: EventKind::Calendar,
            title: row.title,
            date: Some(row.event_date),
            description: row.description,
            tags: row.tags,
        }
    }
}

/// Row from `scheduled_themes`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ThemeRow {
    pub id: i64,
    pub user_id: i64,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: i16,
    pub post_time: NaiveTime,
    pub theme: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl ThemeRow {
    /// Materialize the slot as an event for the given date
    pub fn into_event(self, date: NaiveDate) -> Event {
        Event {
            id: self.id,
            user_id: self.user_id,
            kind: EventKind::Theme,
            title: self.theme,
            date: Some(date),
            description: self.description,
            tags: self.tags,
        }
    }
}
