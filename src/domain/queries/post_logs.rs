//! Attempt log domain - DB queries for post_logs

use sqlx::{Executor, Postgres};

use super::super::models::{AttemptLogRecord, NewAttemptLog};

/// Insert an attempt log entry and return its generated id
pub async fn insert_log<'e, E>(executor: E, log: &NewAttemptLog) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO post_logs (user_id, post_id, post_type, event_ref, content, x_post_id,
                               success, error, model, ai_generated, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        "#,
    )
    .bind(log.user_id)
    .bind(log.post_id)
    .bind(log.post_type.as_str())
    .bind(log.event_ref)
    .bind(&log.content)
    .bind(&log.x_post_id)
    .bind(log.success)
    .bind(&log.error)
    .bind(&log.model)
    .bind(log.ai_generated)
    .bind(log.created_at)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Get the attempt log for a post
pub async fn get_log_for_post<'e, E>(
    executor: E,
    post_id: i64,
    user_id: i64,
) -> Result<Option<AttemptLogRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, post_id, post_type, event_ref, content, x_post_id,
               success, error, model, ai_generated, created_at
        FROM post_logs
        WHERE post_id = $1 AND user_id = $2
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Count attempt logs for pagination
pub async fn count_logs<'e, E>(
    executor: E,
    user_id: i64,
    success: Option<bool>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM post_logs
        WHERE user_id = $1 AND ($2::BOOLEAN IS NULL OR success = $2)
        "#,
    )
    .bind(user_id)
    .bind(success)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// List attempt logs, newest first, with pagination
pub async fn list_logs_paginated<'e, E>(
    executor: E,
    user_id: i64,
    success: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AttemptLogRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, post_id, post_type, event_ref, content, x_post_id,
               success, error, model, ai_generated, created_at
        FROM post_logs
        WHERE user_id = $1 AND ($2::BOOLEAN IS NULL OR success = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(success)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}
