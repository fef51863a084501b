//! Storage seam for attempt logging
//!
//! An [`AttemptStore`] hands out one [`AttemptSession`] per logging
//! operation. The Postgres store checks a connection out of the pool; the
//! connection goes back to the pool when the session is dropped, on every
//! exit path.
//!
//! The session wraps the generic Executor queries in `domain::posts` and
//! `domain::post_logs`, calling them with `&mut *conn`.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

use crate::domain::{NewAttemptLog, NewPostRecord, post_logs, posts};

#[async_trait]
pub trait AttemptSession: Send {
    async fn insert_post(&mut self, post: &NewPostRecord) -> Result<i64, sqlx::Error>;
    async fn insert_log(&mut self, log: &NewAttemptLog) -> Result<i64, sqlx::Error>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync + 'static {
    type Session: AttemptSession;

    async fn session(&self) -> Result<Self::Session, sqlx::Error>;
}

#[async_trait]
impl AttemptStore for PgPool {
    type Session = PoolConnection<Postgres>;

    async fn session(&self) -> Result<Self::Session, sqlx::Error> {
        self.acquire().await
    }
}

#[async_trait]
impl AttemptSession for PoolConnection<Postgres> {
    async fn insert_post(&mut self, post: &NewPostRecord) -> Result<i64, sqlx::Error> {
        posts::insert_post(&mut **self, post).await
    }

    async fn insert_log(&mut self, log: &NewAttemptLog) -> Result<i64, sqlx::Error> {
        post_logs::insert_log(&mut **self, log).await
    }
}
