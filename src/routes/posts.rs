//! Post history endpoints (/posts, /logs)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::domain::{AttemptLogRecord, PostRecord, post_logs, posts};
use crate::routes::auth::Owner;
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(get_post))
        .route("/logs", get(list_logs))
}

#[derive(Debug, Deserialize)]
struct ListPostsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListLogsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    success: Option<bool>,
}

#[derive(Serialize)]
struct ListPostsResponse {
    posts: Vec<PostRecord>,
    total: i64,
    has_more: bool,
}

#[derive(Serialize)]
struct ListLogsResponse {
    logs: Vec<AttemptLogRecord>,
    total: i64,
    has_more: bool,
}

#[derive(Serialize)]
struct PostDetailResponse {
    post: PostRecord,
    log: Option<AttemptLogRecord>,
}

/// Clamp page parameters to `1..=MAX_PAGE_SIZE` and a non-negative offset
fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// GET /posts - List post records, newest first
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Owner(user_id): Owner,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<ListPostsResponse>, StatusCode> {
    let (limit, offset) = page(query.limit, query.offset);
    let status_filter = query.status.as_deref();

    let total = posts::count_posts(&state.db, user_id, status_filter)
        .await
        .log_500("Count posts error")?;

    let result = posts::list_posts_paginated(&state.db, user_id, status_filter, limit, offset)
        .await
        .log_500("List posts error")?;

    let has_more = offset + (result.len() as i64) < total;

    Ok(Json(ListPostsResponse {
        posts: result,
        total,
        has_more,
    }))
}

/// GET /posts/:id - A post together with its attempt log
async fn get_post(
    State(state): State<Arc<AppState>>,
    Owner(user_id): Owner,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetailResponse>, StatusCode> {
    let post = posts::get_post(&state.db, post_id, user_id)
        .await
        .log_500("Get post error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    // A post without a log is the trace of a failed log write; still show it
    let log = post_logs::get_log_for_post(&state.db, post_id, user_id)
        .await
        .log_500("Get post log error")?;

    Ok(Json(PostDetailResponse { post, log }))
}

/// GET /logs - List attempt logs, newest first
async fn list_logs(
    State(state): State<Arc<AppState>>,
    Owner(user_id): Owner,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<ListLogsResponse>, StatusCode> {
    let (limit, offset) = page(query.limit, query.offset);

    let total = post_logs::count_logs(&state.db, user_id, query.success)
        .await
        .log_500("Count logs error")?;

    let logs = post_logs::list_logs_paginated(&state.db, user_id, query.success, limit, offset)
        .await
        .log_500("List logs error")?;

    let has_more = offset + (logs.len() as i64) < total;

    Ok(Json(ListLogsResponse {
        logs,
        total,
        has_more,
    }))
}
