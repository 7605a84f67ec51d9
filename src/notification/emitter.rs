//! Turns a committed workout, progress or nutrition write into an
//! `activity` notification.
//!
//! Emission is best-effort. It runs after the domain record is persisted
//! and every failure is logged here, so the caller's write is never
//! affected.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::gate::PreferenceGate;
use crate::metrics;
use crate::models::activity::ActivityEvent;
use crate::models::notification::NewNotification;
use crate::store::NotificationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Created(Uuid),
    /// The user has notifications off, the flag is unset, or the user is unknown.
    Suppressed,
    /// Logged; the domain write still stands.
    Failed,
}

impl EmitOutcome {
    fn label(&self) -> &'static str {
        match self {
            EmitOutcome::Created(_) => "created",
            EmitOutcome::Suppressed => "suppressed",
            EmitOutcome::Failed => "failed",
        }
    }
}

#[derive(Clone)]
pub struct EventEmitter {
    notifications: Arc<dyn NotificationStore>,
    gate: PreferenceGate,
}

impl EventEmitter {
    pub fn new(notifications: Arc<dyn NotificationStore>, gate: PreferenceGate) -> Self {
        Self { notifications, gate }
    }

    pub async fn emit(&self, user_id: Uuid, event: &ActivityEvent) -> EmitOutcome {
        let outcome = self.try_emit(user_id, event).await;
        metrics::record_emission(event.kind(), outcome.label());
        outcome
    }

    async fn try_emit(&self, user_id: Uuid, event: &ActivityEvent) -> EmitOutcome {
        match self.gate.allows(user_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(user_id = %user_id, kind = event.kind(), "notifications disabled, skipping");
                return EmitOutcome::Suppressed;
            }
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    kind = event.kind(),
                    error = %e,
                    "preference lookup failed, activity notification dropped"
                );
                return EmitOutcome::Failed;
            }
        }

        let notification = NewNotification::activity(user_id, event.message(), Utc::now());
        match self.notifications.insert(notification).await {
            Ok(row) => {
                debug!(user_id = %user_id, notification_id = %row.id, kind = event.kind(), "activity notification created");
                EmitOutcome::Created(row.id)
            }
            Err(e) => {
                error!(
                    user_id = %user_id,
                    kind = event.kind(),
                    error = %e,
                    "failed to create activity notification"
                );
                EmitOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::{DailyReminder, Notification, NotificationType, Page};
    use crate::models::preferences::{NewUser, Preferences, PreferencesUpdate};
    use crate::store::memory::MemoryStore;
    use crate::store::UserDirectory;
    use async_trait::async_trait;

    struct BrokenNotifications;

    #[async_trait]
    impl NotificationStore for BrokenNotifications {
        async fn insert(&self, _: NewNotification) -> anyhow::Result<Notification> {
            anyhow::bail!("connection reset")
        }
        async fn insert_daily_reminder(&self, _: &DailyReminder) -> anyhow::Result<Option<Notification>> {
            anyhow::bail!("connection reset")
        }
        async fn list(&self, _: Uuid, _: Page) -> anyhow::Result<Vec<Notification>> {
            anyhow::bail!("connection reset")
        }
        async fn mark_read(&self, _: Uuid, _: Uuid) -> anyhow::Result<Option<Notification>> {
            anyhow::bail!("connection reset")
        }
        async fn mark_all_read(&self, _: Uuid) -> anyhow::Result<u64> {
            anyhow::bail!("connection reset")
        }
        async fn delete(&self, _: Uuid, _: Uuid) -> anyhow::Result<bool> {
            anyhow::bail!("connection reset")
        }
        async fn unread_count(&self, _: Uuid) -> anyhow::Result<i64> {
            anyhow::bail!("connection reset")
        }
    }

    async fn user(store: &MemoryStore, notifications: bool) -> Uuid {
        store
            .create_user(&NewUser {
                name: "Sam".into(),
                email: format!("{}@example.com", Uuid::new_v4()),
                preferences: Preferences {
                    notifications,
                    ..Preferences::default()
                },
            })
            .await
            .unwrap()
    }

    fn emitter_for(store: &MemoryStore) -> EventEmitter {
        let store = Arc::new(store.clone());
        EventEmitter::new(store.clone(), PreferenceGate::new(store))
    }

    #[tokio::test]
    async fn test_opted_in_user_gets_one_activity_notification() {
        let store = MemoryStore::new();
        let uid = user(&store, true).await;
        let emitter = emitter_for(&store);

        let outcome = emitter
            .emit(uid, &ActivityEvent::Workout { exercise_name: "Deadlift".into() })
            .await;
        assert!(matches!(outcome, EmitOutcome::Created(_)));

        let rows = store.list(uid, Page::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].r#type, NotificationType::Activity);
        assert_eq!(rows[0].message, "Workout completed: Deadlift");
        assert!(!rows[0].is_read);
    }

    #[tokio::test]
    async fn test_gate_is_read_on_every_emit() {
        let store = MemoryStore::new();
        let uid = user(&store, true).await;
        let emitter = emitter_for(&store);
        let event = ActivityEvent::Nutrition { meal_type: "dinner".into() };

        assert!(matches!(emitter.emit(uid, &event).await, EmitOutcome::Created(_)));

        let update = PreferencesUpdate { notifications: Some(false), ..Default::default() };
        store.update_preferences(uid, &update).await.unwrap();
        assert_eq!(emitter.emit(uid, &event).await, EmitOutcome::Suppressed);

        assert_eq!(store.list(uid, Page::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unset_flag_and_unknown_user_are_suppressed() {
        let store = MemoryStore::new();
        let uid = user(&store, true).await;
        store.clear_notifications_flag(uid);
        let emitter = emitter_for(&store);
        let event = ActivityEvent::Progress { weight: 70.0 };

        assert_eq!(emitter.emit(uid, &event).await, EmitOutcome::Suppressed);
        assert_eq!(emitter.emit(Uuid::new_v4(), &event).await, EmitOutcome::Suppressed);
        assert!(store.list(uid, Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let users = MemoryStore::new();
        let uid = user(&users, true).await;
        let emitter = EventEmitter::new(
            Arc::new(BrokenNotifications),
            PreferenceGate::new(Arc::new(users)),
        );

        let outcome = emitter
            .emit(uid, &ActivityEvent::Workout { exercise_name: "Row".into() })
            .await;
        assert_eq!(outcome, EmitOutcome::Failed);
    }
}
