pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::activity::{NewNutritionLog, NewProgress, NewWorkout};
use crate::models::notification::{DailyReminder, NewNotification, Notification, Page};
use crate::models::preferences::{NewUser, Preferences, PreferencesUpdate};

/// Persisted notification records. Every operation is scoped by the
/// owning user; a notification owned by someone else behaves as absent.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: NewNotification) -> anyhow::Result<Notification>;

    /// Insert the user's reminder for `reminder.day` unless one already exists
    /// at or after `reminder.day_start`. Returns `None` when skipped.
    /// Implementations must make the check and the insert atomic.
    async fn insert_daily_reminder(
        &self,
        reminder: &DailyReminder,
    ) -> anyhow::Result<Option<Notification>>;

    /// Newest first.
    async fn list(&self, user_id: Uuid, page: Page) -> anyhow::Result<Vec<Notification>>;

    /// Sets `is_read`. Returns `None` if the id is unknown or not owned by `user_id`.
    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Notification>>;

    async fn mark_all_read(&self, user_id: Uuid) -> anyhow::Result<u64>;

    /// Returns `false` if the id is unknown or not owned by `user_id`.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;

    async fn unread_count(&self, user_id: Uuid) -> anyhow::Result<i64>;
}

/// Users and their preferences.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> anyhow::Result<Uuid>;

    /// `None` when the user is unknown or the flag was never set.
    async fn notifications_enabled(&self, user_id: Uuid) -> anyhow::Result<Option<bool>>;

    async fn opted_in_users(&self) -> anyhow::Result<Vec<Uuid>>;

    async fn preferences(&self, user_id: Uuid) -> anyhow::Result<Option<Preferences>>;

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> anyhow::Result<Option<Preferences>>;
}

/// Create-only persistence for the records that trigger activity notifications.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert_workout(&self, user_id: Uuid, workout: &NewWorkout) -> anyhow::Result<Uuid>;

    async fn insert_progress(&self, user_id: Uuid, progress: &NewProgress) -> anyhow::Result<Uuid>;

    async fn insert_nutrition(
        &self,
        user_id: Uuid,
        log: &NewNutritionLog,
    ) -> anyhow::Result<Uuid>;
}
