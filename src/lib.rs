pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod services;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::pipeline::Pipeline;

pub struct AppState {
    pub db: PgPool,
    pub pipeline: Arc<Pipeline<PgPool>>,
}

/// Full application router with request tracing and CORS
pub fn build_router(state: Arc<AppState>) -> Router {
    routes::build_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
