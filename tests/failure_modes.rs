//! Store failures: notification side effects never break the domain write,
//! and one user's reminder failure never stops the pass.
//!
//! Run with: `cargo test --test failure_modes`

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};
use fittrack::config::Config;
use fittrack::jobs::reminder::{ReminderJob, ReminderSchedule};
use fittrack::models::notification::{DailyReminder, NewNotification, Notification, Page};
use fittrack::models::preferences::{NewUser, Preferences, PreferencesUpdate};
use fittrack::store::memory::MemoryStore;
use fittrack::store::{NotificationStore, UserDirectory};
use fittrack::{api, AppState};
use tower::ServiceExt;
use uuid::Uuid;

/// Delegates to a `MemoryStore`, failing every write for `poisoned` users.
struct FlakyNotifications {
    inner: MemoryStore,
    poisoned: Vec<Uuid>,
}

impl FlakyNotifications {
    fn check(&self, user_id: Uuid) -> anyhow::Result<()> {
        if self.poisoned.contains(&user_id) {
            anyhow::bail!("connection reset by peer");
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for FlakyNotifications {
    async fn insert(&self, n: NewNotification) -> anyhow::Result<Notification> {
        self.check(n.user_id)?;
        self.inner.insert(n).await
    }
    async fn insert_daily_reminder(&self, r: &DailyReminder) -> anyhow::Result<Option<Notification>> {
        self.check(r.user_id)?;
        self.inner.insert_daily_reminder(r).await
    }
    async fn list(&self, user_id: Uuid, page: Page) -> anyhow::Result<Vec<Notification>> {
        self.inner.list(user_id, page).await
    }
    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Notification>> {
        self.inner.mark_read(user_id, id).await
    }
    async fn mark_all_read(&self, user_id: Uuid) -> anyhow::Result<u64> {
        self.inner.mark_all_read(user_id).await
    }
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        self.inner.delete(user_id, id).await
    }
    async fn unread_count(&self, user_id: Uuid) -> anyhow::Result<i64> {
        self.inner.unread_count(user_id).await
    }
}

/// A user directory whose backing database is gone.
struct UnreachableUsers;

#[async_trait]
impl UserDirectory for UnreachableUsers {
    async fn create_user(&self, _: &NewUser) -> anyhow::Result<Uuid> {
        anyhow::bail!("pool timed out")
    }
    async fn notifications_enabled(&self, _: Uuid) -> anyhow::Result<Option<bool>> {
        anyhow::bail!("pool timed out")
    }
    async fn opted_in_users(&self) -> anyhow::Result<Vec<Uuid>> {
        anyhow::bail!("pool timed out")
    }
    async fn preferences(&self, _: Uuid) -> anyhow::Result<Option<Preferences>> {
        anyhow::bail!("pool timed out")
    }
    async fn update_preferences(&self, _: Uuid, _: &PreferencesUpdate) -> anyhow::Result<Option<Preferences>> {
        anyhow::bail!("pool timed out")
    }
}

async fn user(store: &MemoryStore) -> Uuid {
    store
        .create_user(&NewUser {
            name: "Flaky".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            preferences: Preferences::default(),
        })
        .await
        .unwrap()
}

fn schedule() -> ReminderSchedule {
    ReminderSchedule::new(
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        FixedOffset::east_opt(0).unwrap(),
    )
}

#[tokio::test]
async fn test_domain_write_survives_notification_failure() {
    let store = MemoryStore::new();
    let a = user(&store).await;
    let flaky = Arc::new(FlakyNotifications {
        inner: store.clone(),
        poisoned: vec![a],
    });
    let shared = Arc::new(store.clone());
    let state = Arc::new(AppState::new(flaky, shared.clone(), shared, Config::default()));

    let body = serde_json::json!({ "userId": a, "exerciseName": "Deadlift" });
    let resp = api::app(state)
        .oneshot(
            Request::post("/workouts")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(store.activities_for(a).len(), 1);
    assert!(store.list(a, Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reminder_failure_for_one_user_continues() {
    let store = MemoryStore::new();
    let ok_before = user(&store).await;
    let broken = user(&store).await;
    let ok_after = user(&store).await;

    let flaky = Arc::new(FlakyNotifications {
        inner: store.clone(),
        poisoned: vec![broken],
    });
    let job = ReminderJob::new(flaky, Arc::new(store.clone()), schedule(), "Log today");

    let summary = job.tick(Utc.with_ymd_and_hms(2025, 4, 2, 8, 0, 0).unwrap()).await.unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 1);

    for (user_id, expected) in [(ok_before, 1), (broken, 0), (ok_after, 1)] {
        assert_eq!(store.list(user_id, Page::default()).await.unwrap().len(), expected);
    }
}

#[tokio::test]
async fn test_reminder_pass_fails_when_users_cannot_be_listed() {
    let store = Arc::new(MemoryStore::new());
    let job = ReminderJob::new(store, Arc::new(UnreachableUsers), schedule(), "Log today");

    tokio_test::assert_err!(job.tick(Utc::now()).await);
}
