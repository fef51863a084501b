//! Background scheduler
//!
//! Every tick picks up calendar events dated today and theme slots whose time
//! has passed today. "Today" is the UTC date, and post rows are stamped in
//! UTC, so a slot's post for the day is found with `[00:00Z, 24:00Z)` bounds
//! rather than a session-timezone date cast.
//!
//! A calendar event with any post row is not run again. A theme slot runs at
//! most once per UTC date. Generation failures leave no row, so those come
//! back on a later tick. An attempt that may have published without leaving
//! a post row is held in memory until restart instead of being retried.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use futures::StreamExt;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{Event, EventRow, PersonaProfile, PostType, ThemeRow, events, personas, posts};
use crate::services::db::AttemptStore;
use crate::services::pipeline::Pipeline;

/// Rows that are scheduled for the current day, before dedup
#[derive(Debug, Clone, Default)]
pub struct DueCandidates {
    pub events: Vec<EventRow>,
    pub themes: Vec<ThemeRow>,
}

/// Candidate ids that already have a post row
#[derive(Debug, Clone, Default)]
pub struct PostedRefs {
    pub events: HashSet<i64>,
    /// Only posts stamped inside the current UTC day
    pub themes: HashSet<i64>,
}

/// Identifies one scheduled attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    pub post_type: PostType,
    pub event_ref: i64,
    pub date: NaiveDate,
}

impl AttemptKey {
    pub fn new(event: &Event, date: NaiveDate) -> Self {
        Self {
            post_type: event.post_type(),
            event_ref: event.id,
            date,
        }
    }
}

/// Reads the scheduler needs from storage
#[async_trait]
pub trait ScheduleSource: Send + Sync + 'static {
    async fn candidates(&self, date: NaiveDate, time: NaiveTime) -> Result<DueCandidates, sqlx::Error>;

    async fn posted(
        &self,
        candidates: &DueCandidates,
        day: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<PostedRefs, sqlx::Error>;

    async fn persona(&self, owner_id: i64) -> Result<Option<PersonaProfile>, sqlx::Error>;
}

#[async_trait]
impl ScheduleSource for PgPool {
    async fn candidates(&self, date: NaiveDate, time: NaiveTime) -> Result<DueCandidates, sqlx::Error> {
        Ok(DueCandidates {
            events: events::list_events_on(self, date).await?,
            themes: events::list_theme_slots(self, weekday_index(date), time).await?,
        })
    }

    async fn posted(
        &self,
        candidates: &DueCandidates,
        day: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<PostedRefs, sqlx::Error> {
        let event_ids: Vec<i64> = candidates.events.iter().map(|row| row.id).collect();
        let theme_ids: Vec<i64> = candidates.themes.iter().map(|row| row.id).collect();

        let events = posts::posted_event_refs(self, PostType::Event, &event_ids, None).await?;
        let themes = posts::posted_event_refs(self, PostType::Theme, &theme_ids, Some(day)).await?;

        Ok(PostedRefs {
            events: events.into_iter().collect(),
            themes: themes.into_iter().collect(),
        })
    }

    async fn persona(&self, owner_id: i64) -> Result<Option<PersonaProfile>, sqlx::Error> {
        personas::get_persona(self, owner_id).await
    }
}

/// Weekday as stored on theme slots: 0 = Monday .. 6 = Sunday
pub fn weekday_index(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_monday() as i16
}

/// `[date 00:00Z, date+1 00:00Z)`
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

/// Calendar events first, then theme slots in slot-time order, minus anything
/// already posted or held
pub fn select_due(
    candidates: DueCandidates,
    posted: &PostedRefs,
    held: &HashSet<AttemptKey>,
    date: NaiveDate,
) -> Vec<Event> {
    let events = candidates
        .events
        .into_iter()
        .filter(|row| !posted.events.contains(&row.id))
        .map(Event::from);
    let themes = candidates
        .themes
        .into_iter()
        .filter(|row| !posted.themes.contains(&row.id))
        .map(|row| row.into_event(date));

    events
        .chain(themes)
        .filter(|event| !held.contains(&AttemptKey::new(event, date)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Published,
    NotPublished,
    Held,
}

/// Counts for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub published: usize,
    pub not_published: usize,
    pub held: usize,
}

pub struct Scheduler<D, S> {
    source: D,
    pipeline: Arc<Pipeline<S>>,
    max_concurrent: usize,
    held: Mutex<HashSet<AttemptKey>>,
}

impl<D: ScheduleSource, S: AttemptStore> Scheduler<D, S> {
    pub fn new(source: D, pipeline: Arc<Pipeline<S>>, max_concurrent: usize) -> Self {
        Self {
            source,
            pipeline,
            max_concurrent: max_concurrent.max(1),
            held: Mutex::new(HashSet::new()),
        }
    }

    /// Tick forever. Cancel the surrounding task to stop.
    pub async fn run(&self, check_interval: Duration) {
        let mut interval = tokio::time::interval(check_interval);
        info!(
            interval_secs = check_interval.as_secs(),
            max_concurrent = self.max_concurrent,
            "Background scheduler started"
        );

        loop {
            interval.tick().await;

            match self.tick(Utc::now()).await {
                Ok(summary) if summary.due == 0 => debug!("Nothing due"),
                Ok(summary) => info!(
                    due = summary.due,
                    published = summary.published,
                    not_published = summary.not_published,
                    held = summary.held,
                    "Scheduler cycle complete"
                ),
                Err(e) => error!(error = %e, "Error finding due events"),
            }
        }
    }

    /// Run everything due at `now`, at most `max_concurrent` at a time
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary, sqlx::Error> {
        let date = now.date_naive();
        let candidates = self.source.candidates(date, now.time()).await?;
        let posted = self.source.posted(&candidates, day_bounds(date)).await?;
        let due = {
            let held = self.held.lock().await;
            select_due(candidates, &posted, &held, date)
        };

        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };
        if due.is_empty() {
            return Ok(summary);
        }

        info!(count = due.len(), %date, "Running due events");
        let outcomes: Vec<RunOutcome> = futures::stream::iter(due)
            .map(|event| self.run_one(event, date))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                RunOutcome::Published => summary.published += 1,
                RunOutcome::NotPublished => summary.not_published += 1,
                RunOutcome::Held => summary.held += 1,
            }
        }
        Ok(summary)
    }

    /// Attempts withheld from future ticks
    pub async fn held_count(&self) -> usize {
        self.held.lock().await.len()
    }

    async fn run_one(&self, event: Event, date: NaiveDate) -> RunOutcome {
        let persona = match self.source.persona(event.user_id).await {
            Ok(persona) => persona,
            Err(e) => {
                error!(event_id = event.id, user_id = event.user_id, error = %e, "Error loading persona");
                return RunOutcome::NotPublished;
            }
        };

        match self.pipeline.run(&event, persona.as_ref()).await {
            Ok(result) if result.success => RunOutcome::Published,
            Ok(result) => {
                warn!(
                    event_id = event.id,
                    post_id = result.post_id,
                    error = ?result.error,
                    "Scheduled post was not published"
                );
                RunOutcome::NotPublished
            }
            Err(e) if e.is_inconsistent() => {
                error!(
                    event_id = event.id,
                    post_type = %event.post_type(),
                    error = %e,
                    "Scheduled attempt may be unrecorded; holding it until restart"
                );
                self.held.lock().await.insert(AttemptKey::new(&event, date));
                RunOutcome::Held
            }
            Err(e) => {
                warn!(event_id = event.id, error = %e, "Scheduled attempt failed before publishing");
                RunOutcome::NotPublished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event_row(id: i64, on: NaiveDate) -> EventRow {
        EventRow {
            id,
            user_id: 1,
            title: format!("Event {id}"),
            event_date: on,
            description: None,
            tags: Vec::new(),
        }
    }

    fn theme_row(id: i64, hour: u32) -> ThemeRow {
        ThemeRow {
            id,
            user_id: 1,
            weekday: 0,
            post_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            theme: format!("Theme {id}"),
            description: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn weekday_index_starts_on_monday() {
        let monday = date(2025, 6, 2);
        assert_eq!(weekday_index(monday), 0);
        assert_eq!(weekday_index(monday + chrono::Days::new(6)), 6);
    }

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let (since, until) = day_bounds(date(2026, 10, 19));
        assert_eq!(since, Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap());

        // Late the previous evening UTC, even if already Monday further east
        let previous_evening = Utc.with_ymd_and_hms(2026, 10, 18, 23, 0, 5).unwrap();
        assert!(previous_evening < since);

        let this_morning = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 5).unwrap();
        assert!(since <= this_morning && this_morning < until);
    }

    #[test]
    fn events_come_before_themes() {
        let today = date(2026, 10, 19);
        let candidates = DueCandidates {
            events: vec![event_row(3, today)],
            themes: vec![theme_row(1, 8), theme_row(2, 9)],
        };

        let due = select_due(candidates, &PostedRefs::default(), &HashSet::new(), today);

        let order: Vec<(PostType, i64)> = due.iter().map(|e| (e.post_type(), e.id)).collect();
        assert_eq!(
            order,
            vec![(PostType::Event, 3), (PostType::Theme, 1), (PostType::Theme, 2)]
        );
        assert!(due.iter().all(|e| e.date == Some(today)));
    }

    #[test]
    fn posted_refs_are_skipped_per_post_type() {
        let today = date(2026, 10, 19);
        let candidates = DueCandidates {
            events: vec![event_row(1, today), event_row(2, today)],
            themes: vec![theme_row(1, 8), theme_row(2, 9)],
        };
        let posted = PostedRefs {
            events: HashSet::from([1]),
            themes: HashSet::from([2]),
        };

        let due = select_due(candidates, &posted, &HashSet::new(), today);

        let order: Vec<(PostType, i64)> = due.iter().map(|e| (e.post_type(), e.id)).collect();
        assert_eq!(order, vec![(PostType::Event, 2), (PostType::Theme, 1)]);
    }

    #[test]
    fn held_attempts_are_skipped_for_their_date_only() {
        let today = date(2026, 10, 19);
        let held = HashSet::from([AttemptKey {
            post_type: PostType::Theme,
            event_ref: 1,
            date: today,
        }]);
        let candidates = DueCandidates {
            events: vec![event_row(1, today)],
            themes: vec![theme_row(1, 8)],
        };

        let due = select_due(candidates.clone(), &PostedRefs::default(), &held, today);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].post_type(), PostType::Event);

        let next_week = today + chrono::Days::new(7);
        let due = select_due(candidates, &PostedRefs::default(), &held, next_week);
        assert_eq!(due.len(), 2);
    }
}
