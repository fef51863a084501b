//! Event domain - DB queries for calendar events and theme slots

use chrono::{NaiveDate, NaiveTime};
use sqlx::{Executor, Postgres};

use super::super::models::{EventRow, ThemeRow};

/// Get a calendar event owned by a user
pub async fn get_event<'e, E>(
    executor: E,
    event_id: i64,
    user_id: i64,
) -> Result<Option<EventRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, title, event_date, description, tags
        FROM calendar_events
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Get a theme slot owned by a user
pub async fn get_theme<'e, E>(
    executor: E,
    theme_id: i64,
    user_id: i64,
) -> Result<Option<ThemeRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, weekday, post_time, theme, description, tags
        FROM scheduled_themes
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(theme_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Calendar events dated `date`
pub async fn list_events_on<'e, E>(executor: E, date: NaiveDate) -> Result<Vec<EventRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, title, event_date, description, tags
        FROM calendar_events
        WHERE event_date = $1
        ORDER BY id ASC
        "#,
    )
    .bind(date)
    .fetch_all(executor)
    .await
}

/// Active theme slots for `weekday` whose post time is at or before `now`
pub async fn list_theme_slots<'e, E>(
    executor: E,
    weekday: i16,
    now: NaiveTime,
) -> Result<Vec<ThemeRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, weekday, post_time, theme, description, tags
        FROM scheduled_themes
        WHERE active
          AND weekday = $1
          AND post_time <= $2
        ORDER BY post_time ASC, id ASC
        "#,
    )
    .bind(weekday)
    .bind(now)
    .fetch_all(executor)
    .await
}
