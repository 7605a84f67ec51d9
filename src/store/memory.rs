//! In-process store used by tests and by `FITTRACK_STORE=memory` dev runs.
//!
//! Notifications are sharded per user in a `DashMap`, so every
//! check-then-write on one user's notifications runs under that entry's lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{ActivityStore, NotificationStore, UserDirectory};
use crate::models::activity::{NewNutritionLog, NewProgress, NewWorkout};
use crate::models::notification::{DailyReminder, NewNotification, Notification, NotificationType, Page};
use crate::models::preferences::{NewUser, Preferences, PreferencesUpdate, Theme, Units};

#[derive(Clone)]
struct StoredNotification {
    notification: Notification,
    reminder_day: Option<NaiveDate>,
}

#[derive(Clone)]
struct UserRecord {
    email: String,
    notifications: Option<bool>,
    units: Units,
    theme: Theme,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub enum ActivityRecord {
    Workout(NewWorkout),
    Progress(NewProgress),
    Nutrition(NewNutritionLog),
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    notifications: Arc<DashMap<Uuid, Vec<StoredNotification>>>,
    users: Arc<DashMap<Uuid, UserRecord>>,
    activities: Arc<DashMap<Uuid, (Uuid, ActivityRecord)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the stored notification flag so it reads as never set.
    pub fn clear_notifications_flag(&self, user_id: Uuid) {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.notifications = None;
        }
    }

    /// Activity records written for `user_id`, in no particular order.
    pub fn activities_for(&self, user_id: Uuid) -> Vec<ActivityRecord> {
        self.activities
            .iter()
            .filter(|e| e.value().0 == user_id)
            .map(|e| e.value().1.clone())
            .collect()
    }

    fn store_notification(
        &self,
        notification: Notification,
        reminder_day: Option<NaiveDate>,
    ) -> Notification {
        self.notifications
            .entry(notification.user_id)
            .or_default()
            .push(StoredNotification {
                notification: notification.clone(),
                reminder_day,
            });
        notification
    }

    fn insert_activity(&self, user_id: Uuid, record: ActivityRecord) -> Uuid {
        let id = Uuid::new_v4();
        self.activities.insert(id, (user_id, record));
        id
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: NewNotification) -> anyhow::Result<Notification> {
        notification.validate()?;
        let row = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            r#type: notification.r#type,
            message: notification.message,
            is_read: false,
            date: notification.date,
        };
        Ok(self.store_notification(row, None))
    }

    async fn insert_daily_reminder(
        &self,
        reminder: &DailyReminder,
    ) -> anyhow::Result<Option<Notification>> {
        let mut entry = self.notifications.entry(reminder.user_id).or_default();
        let exists = entry.iter().any(|s| {
            s.reminder_day == Some(reminder.day)
                || (s.notification.r#type == NotificationType::Reminder
                    && s.notification.date >= reminder.day_start)
        });
        if exists {
            return Ok(None);
        }

        let row = Notification {
            id: Uuid::new_v4(),
            user_id: reminder.user_id,
            r#type: NotificationType::Reminder,
            message: reminder.message.clone(),
            is_read: false,
            date: reminder.date,
        };
        entry.push(StoredNotification {
            notification: row.clone(),
            reminder_day: Some(reminder.day),
        });
        Ok(Some(row))
    }

    async fn list(&self, user_id: Uuid, page: Page) -> anyhow::Result<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .notifications
            .get(&user_id)
            .map(|v| v.iter().map(|s| s.notification.clone()).collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

        let offset = page.offset as usize;
        let rows = rows.into_iter().skip(offset);
        Ok(match page.limit {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        })
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Notification>> {
        let Some(mut rows) = self.notifications.get_mut(&user_id) else {
            return Ok(None);
        };
        Ok(rows
            .iter_mut()
            .find(|s| s.notification.id == id)
            .map(|s| {
                s.notification.is_read = true;
                s.notification.clone()
            }))
    }

    async fn mark_all_read(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let Some(mut rows) = self.notifications.get_mut(&user_id) else {
            return Ok(0);
        };
        let mut updated = 0;
        for s in rows.iter_mut().filter(|s| !s.notification.is_read) {
            s.notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let Some(mut rows) = self.notifications.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|s| s.notification.id != id);
        Ok(rows.len() < before)
    }

    async fn unread_count(&self, user_id: Uuid) -> anyhow::Result<i64> {
        Ok(self
            .notifications
            .get(&user_id)
            .map(|v| v.iter().filter(|s| !s.notification.is_read).count() as i64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> anyhow::Result<Uuid> {
        if self.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            anyhow::bail!("email already registered: {}", user.email);
        }
        let id = Uuid::new_v4();
        self.users.insert(
            id,
            UserRecord {
                email: user.email.clone(),
                notifications: Some(user.preferences.notifications),
                units: user.preferences.units,
                theme: user.preferences.theme,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn notifications_enabled(&self, user_id: Uuid) -> anyhow::Result<Option<bool>> {
        Ok(self.users.get(&user_id).and_then(|u| u.notifications))
    }

    async fn opted_in_users(&self) -> anyhow::Result<Vec<Uuid>> {
        let mut users: Vec<(DateTime<Utc>, Uuid)> = self
            .users
            .iter()
            .filter(|u| u.notifications == Some(true))
            .map(|u| (u.created_at, *u.key()))
            .collect();
        users.sort();
        Ok(users.into_iter().map(|(_, id)| id).collect())
    }

    async fn preferences(&self, user_id: Uuid) -> anyhow::Result<Option<Preferences>> {
        Ok(self.users.get(&user_id).map(|u| Preferences {
            notifications: u.notifications.unwrap_or(false),
            units: u.units,
            theme: u.theme,
        }))
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> anyhow::Result<Option<Preferences>> {
        let Some(mut user) = self.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(n) = update.notifications {
            user.notifications = Some(n);
        }
        let mut prefs = Preferences {
            notifications: user.notifications.unwrap_or(false),
            units: user.units,
            theme: user.theme,
        };
        update.apply(&mut prefs);
        user.units = prefs.units;
        user.theme = prefs.theme;
        Ok(Some(prefs))
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert_workout(&self, user_id: Uuid, workout: &NewWorkout) -> anyhow::Result<Uuid> {
        Ok(self.insert_activity(user_id, ActivityRecord::Workout(workout.clone())))
    }

    async fn insert_progress(&self, user_id: Uuid, progress: &NewProgress) -> anyhow::Result<Uuid> {
        Ok(self.insert_activity(user_id, ActivityRecord::Progress(progress.clone())))
    }

    async fn insert_nutrition(
        &self,
        user_id: Uuid,
        log: &NewNutritionLog,
    ) -> anyhow::Result<Uuid> {
        Ok(self.insert_activity(user_id, ActivityRecord::Nutrition(log.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reminder_for(user_id: Uuid, day: NaiveDate) -> DailyReminder {
        let day_start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
        DailyReminder {
            user_id,
            day,
            day_start,
            message: "log today".into(),
            date: day_start + Duration::hours(8),
        }
    }

    #[tokio::test]
    async fn test_reminder_unique_per_day() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        assert!(store.insert_daily_reminder(&reminder_for(user, day)).await.unwrap().is_some());
        assert!(store.insert_daily_reminder(&reminder_for(user, day)).await.unwrap().is_none());

        let next = day.succ_opt().unwrap();
        assert!(store.insert_daily_reminder(&reminder_for(user, next)).await.unwrap().is_some());
        assert_eq!(store.list(user, Page::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_reminders_create_one() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let r = reminder_for(user, day);
                tokio::spawn(async move { store.insert_daily_reminder(&r).await.unwrap() })
            })
            .collect();

        let mut created = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_list_pagination_newest_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        for i in 0..5 {
            store
                .insert(NewNotification::activity(user, format!("n{}", i), base + Duration::minutes(i)))
                .await
                .unwrap();
        }

        let page = store.list(user, Page::new(Some(2), Some(1))).await.unwrap();
        let messages: Vec<_> = page.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["n3", "n2"]);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        let user = NewUser {
            name: "A".into(),
            email: "a@example.com".into(),
            preferences: Preferences::default(),
        };
        store.create_user(&user).await.unwrap();
        assert!(store.create_user(&user).await.is_err());
    }
}
