//! Post domain - DB queries for posts
//!
//! Posts are append-only: there is no update or delete here.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use super::super::models::{NewPostRecord, PostRecord, PostType};

/// Parsed status filter enum for type-safe query building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Posted,
    Failed,
    All,
}

impl StatusFilter {
    pub fn from_str(s: Option<&str>) -> Self {
        match s {
            Some("posted") => StatusFilter::Posted,
            Some("failed") => StatusFilter::Failed,
            _ => StatusFilter::All,
        }
    }

    /// Returns SQL WHERE clause fragment for filtering by post status
    fn where_clause(&self) -> &'static str {
        match self {
            StatusFilter::Posted => "AND status = 'posted'",
            StatusFilter::Failed => "AND status = 'failed'",
            StatusFilter::All => "",
        }
    }
}

/// Insert a post and return its generated id
pub async fn insert_post<'e, E>(executor: E, post: &NewPostRecord) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO posts (user_id, content, status, post_type, event_ref, scheduled_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(post.user_id)
    .bind(&post.content)
    .bind(post.status.as_str())
    .bind(post.post_type.as_str())
    .bind(post.event_ref)
    .bind(post.scheduled_at)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Event refs among `refs` that already have a post of `post_type`.
/// With bounds, only posts stamped in `[since, until)` count.
pub async fn posted_event_refs<'e, E>(
    executor: E,
    post_type: PostType,
    refs: &[i64],
    bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if refs.is_empty() {
        return Ok(Vec::new());
    }
    let (since, until) = bounds.unzip();

    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT event_ref
        FROM posts
        WHERE post_type = $1
          AND event_ref = ANY($2)
          AND ($3::TIMESTAMPTZ IS NULL OR scheduled_at >= $3)
          AND ($4::TIMESTAMPTZ IS NULL OR scheduled_at < $4)
        "#,
    )
    .bind(post_type.as_str())
    .bind(refs)
    .bind(since)
    .bind(until)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Get a post owned by a user
pub async fn get_post<'e, E>(
    executor: E,
    post_id: i64,
    user_id: i64,
) -> Result<Option<PostRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, content, status, post_type, event_ref, scheduled_at
        FROM posts
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Count posts for pagination
pub async fn count_posts<'e, E>(
    executor: E,
    user_id: i64,
    status_filter: Option<&str>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let filter = StatusFilter::from_str(status_filter);
    let query = format!(
        "SELECT COUNT(*) FROM posts WHERE user_id = $1 {}",
        filter.where_clause()
    );

    let (count,): (i64,) = sqlx::query_as(&query)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// List posts, newest first, with pagination
pub async fn list_posts_paginated<'e, E>(
    executor: E,
    user_id: i64,
    status_filter: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let filter = StatusFilter::from_str(status_filter);
    let query = format!(
        r#"SELECT id, user_id, content, status, post_type, event_ref, scheduled_at
           FROM posts
           WHERE user_id = $1 {}
           ORDER BY scheduled_at DESC, id DESC
           LIMIT $2 OFFSET $3"#,
        filter.where_clause()
    );

    sqlx::query_as(&query)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
}
