//! Pipeline trigger endpoints (/pipeline/*)

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tracing::info;

use crate::AppState;
use crate::domain::{Event, events, personas};
use crate::routes::auth::Owner;
use crate::services::error::ApiError;
use crate::services::pipeline::PipelineResult;

pub fn routes() -> Router<Arc<AppState>> {
    // Every run may publish a real post: 1 request per 2 seconds, burst of 5
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(5)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/pipeline/events/{id}/run", post(run_event))
        .route("/pipeline/themes/{id}/run", post(run_theme))
        .route("/pipeline/manual", post(run_manual))
        .layer(rate_limit_layer)
}

#[derive(Debug, Deserialize)]
struct ManualPostRequest {
    text: String,
}

/// POST /pipeline/events/:id/run - Generate and publish a post for a calendar event
async fn run_event(
    State(state): State<Arc<AppState>>,
    Owner(user_id): Owner,
    Path(event_id): Path<i64>,
) -> Result<Json<PipelineResult>, ApiError> {
    let event: Event = events::get_event(&state.db, event_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("event"))?
        .into();

    run_for(&state, user_id, &event).await
}

/// POST /pipeline/themes/:id/run - Generate and publish a post for a theme slot, dated today
async fn run_theme(
    State(state): State<Arc<AppState>>,
    Owner(user_id): Owner,
    Path(theme_id): Path<i64>,
) -> Result<Json<PipelineResult>, ApiError> {
    let event = events::get_theme(&state.db, theme_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("theme"))?
        .into_event(Utc::now().date_naive());

    run_for(&state, user_id, &event).await
}

/// POST /pipeline/manual - Publish operator-written text
async fn run_manual(
    State(state): State<Arc<AppState>>,
    Owner(user_id): Owner,
    Json(body): Json<ManualPostRequest>,
) -> Result<Json<PipelineResult>, ApiError> {
    info!(user_id, "Manual post requested");
    let result = state.pipeline.run_manual(user_id, &body.text).await?;
    Ok(Json(result))
}

async fn run_for(state: &AppState, user_id: i64, event: &Event) -> Result<Json<PipelineResult>, ApiError> {
    let persona = personas::get_persona(&state.db, user_id).await?;
    info!(user_id, event_id = event.id, post_type = %event.post_type(), "Pipeline run requested");

    let result = state.pipeline.run(event, persona.as_ref()).await?;
    Ok(Json(result))
}
