//! Domain models and Postgres queries
//!
//! Query functions use the generic Executor pattern, so they accept either
//! `&PgPool` or `&mut PgConnection`.

pub mod models;
pub mod queries;

pub use models::*;
pub use queries::{events, personas, post_logs, posts};
