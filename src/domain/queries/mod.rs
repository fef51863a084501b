//! Postgres queries

pub mod events;
pub mod personas;
pub mod post_logs;
pub mod posts;
