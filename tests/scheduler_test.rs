//! Scheduler ticks against in-memory storage

mod common;

use chrono::{Duration, Utc};
use std::sync::Arc;

use autopost::domain::{NewPostRecord, PostStatus, PostType};
use autopost::scheduler::{DueCandidates, Scheduler, TickSummary, day_bounds};
use common::{
    FakeCompletion, FakePoster, MemorySchedule, MemoryStore, Reply, calendar_row, pipeline,
    theme_row,
};

fn scheduler(
    candidates: DueCandidates,
    completion: Arc<FakeCompletion>,
    poster: Arc<FakePoster>,
    store: MemoryStore,
) -> Scheduler<MemorySchedule, MemoryStore> {
    let source = MemorySchedule {
        candidates,
        store: store.clone(),
    };
    Scheduler::new(source, Arc::new(pipeline(completion, poster, store)), 4)
}

#[tokio::test]
async fn theme_slot_posts_once_per_day() {
    let poster = FakePoster::ok();
    let store = MemoryStore::default();
    let scheduler = scheduler(
        DueCandidates {
            themes: vec![theme_row(7)],
            ..DueCandidates::default()
        },
        FakeCompletion::text("New week, new goals"),
        poster.clone(),
        store.clone(),
    );
    let now = Utc::now();

    let first = scheduler.tick(now).await.unwrap();
    let second = scheduler.tick(now).await.unwrap();

    assert_eq!(first.published, 1);
    assert_eq!(second, TickSummary::default());
    assert_eq!(poster.calls(), 1);
    assert_eq!(store.post_count(), 1);
}

#[tokio::test]
async fn theme_posted_the_previous_utc_day_runs_again() {
    let poster = FakePoster::ok();
    let store = MemoryStore::default();
    let now = Utc::now();
    let (start_of_today, _) = day_bounds(now.date_naive());

    store.writes.lock().unwrap().posts.push(NewPostRecord {
        user_id: 1,
        content: "Last week".to_string(),
        status: PostStatus::Posted,
        post_type: PostType::Theme,
        event_ref: Some(7),
        scheduled_at: start_of_today - Duration::seconds(55),
    });

    let scheduler = scheduler(
        DueCandidates {
            themes: vec![theme_row(7)],
            ..DueCandidates::default()
        },
        FakeCompletion::text("New week, new goals"),
        poster.clone(),
        store.clone(),
    );

    let summary = scheduler.tick(now).await.unwrap();

    assert_eq!(summary.due, 1);
    assert_eq!(poster.calls(), 1);
}

#[tokio::test]
async fn failed_publish_is_not_retried() {
    let poster = FakePoster::failing("timeout");
    let store = MemoryStore::default();
    let now = Utc::now();
    let scheduler = scheduler(
        DueCandidates {
            events: vec![calendar_row(42, now.date_naive())],
            ..DueCandidates::default()
        },
        FakeCompletion::text("Launch!"),
        poster.clone(),
        store.clone(),
    );

    let first = scheduler.tick(now).await.unwrap();
    let second = scheduler.tick(now).await.unwrap();

    assert_eq!(first.not_published, 1);
    assert_eq!(second.due, 0);
    assert_eq!(poster.calls(), 1);
    assert_eq!(store.writes.lock().unwrap().posts[0].status, PostStatus::Failed);
}

#[tokio::test]
async fn generation_failure_is_retried_on_the_next_tick() {
    let completion = FakeCompletion::new(Reply::Status(503));
    let poster = FakePoster::ok();
    let store = MemoryStore::default();
    let now = Utc::now();
    let scheduler = scheduler(
        DueCandidates {
            events: vec![calendar_row(42, now.date_naive())],
            ..DueCandidates::default()
        },
        completion.clone(),
        poster.clone(),
        store.clone(),
    );

    scheduler.tick(now).await.unwrap();
    let second = scheduler.tick(now).await.unwrap();

    assert_eq!(second.due, 1);
    assert_eq!(completion.calls(), 2);
    assert_eq!(poster.calls(), 0);
    assert_eq!(store.post_count(), 0);
}

#[tokio::test]
async fn unrecorded_publish_is_held_until_restart() {
    let poster = FakePoster::ok();
    let store = MemoryStore::failing_posts();
    let now = Utc::now();
    let scheduler = scheduler(
        DueCandidates {
            events: vec![calendar_row(42, now.date_naive())],
            themes: vec![theme_row(7)],
        },
        FakeCompletion::text("Launch!"),
        poster.clone(),
        store.clone(),
    );

    let first = scheduler.tick(now).await.unwrap();
    assert_eq!(first.held, 2);
    assert_eq!(poster.calls(), 2);

    for _ in 0..3 {
        assert_eq!(scheduler.tick(now).await.unwrap().due, 0);
    }

    assert_eq!(poster.calls(), 2);
    assert_eq!(scheduler.held_count().await, 2);
}
