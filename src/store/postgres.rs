use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ActivityStore, NotificationStore, UserDirectory};
use crate::models::activity::{NewNutritionLog, NewProgress, NewWorkout};
use crate::models::notification::{DailyReminder, NewNotification, Notification, NotificationType, Page};
use crate::models::preferences::{NewUser, Preferences, PreferencesUpdate, UserPreferencesRow};

const NOTIFICATION_COLUMNS: &str = "id, user_id, type, message, is_read, date";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// -- Notification Operations --

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert(&self, notification: NewNotification) -> anyhow::Result<Notification> {
        notification.validate()?;
        let row = sqlx::query_as::<_, Notification>(&format!(
            r#"INSERT INTO notifications (user_id, type, message, date)
               VALUES ($1, $2, $3, $4)
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(notification.user_id)
        .bind(notification.r#type)
        .bind(&notification.message)
        .bind(notification.date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_daily_reminder(
        &self,
        reminder: &DailyReminder,
    ) -> anyhow::Result<Option<Notification>> {
        // The NOT EXISTS guard covers reminders written without a day bucket;
        // the unique (user_id, reminder_day) index covers concurrent runs.
        let row = sqlx::query_as::<_, Notification>(&format!(
            r#"INSERT INTO notifications (user_id, type, message, date, reminder_day)
               SELECT $1, $2, $3, $4, $5
               WHERE NOT EXISTS (
                   SELECT 1 FROM notifications
                   WHERE user_id = $1 AND type = $2 AND date >= $6
               )
               ON CONFLICT (user_id, reminder_day) DO NOTHING
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(reminder.user_id)
        .bind(NotificationType::Reminder)
        .bind(&reminder.message)
        .bind(reminder.date)
        .bind(reminder.day)
        .bind(reminder.day_start)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list(&self, user_id: Uuid, page: Page) -> anyhow::Result<Vec<Notification>> {
        // LIMIT NULL means no limit in Postgres.
        let rows = sqlx::query_as::<_, Notification>(&format!(
            r#"SELECT {NOTIFICATION_COLUMNS}
               FROM notifications
               WHERE user_id = $1
               ORDER BY date DESC, id DESC
               LIMIT $2 OFFSET $3"#
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Notification>> {
        let row = sqlx::query_as::<_, Notification>(&format!(
            r#"UPDATE notifications SET is_read = true
               WHERE id = $1 AND user_id = $2
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM notifications WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unread_count(&self, user_id: Uuid) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// -- User Operations --

#[async_trait]
impl UserDirectory for PgStore {
    async fn create_user(&self, user: &NewUser) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO users (name, email, notifications, units, theme)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.preferences.notifications)
        .bind(user.preferences.units)
        .bind(user.preferences.theme)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn notifications_enabled(&self, user_id: Uuid) -> anyhow::Result<Option<bool>> {
        let flag = sqlx::query_scalar::<_, Option<bool>>(
            "SELECT notifications FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(flag.flatten())
    }

    async fn opted_in_users(&self) -> anyhow::Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE notifications = TRUE ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn preferences(&self, user_id: Uuid) -> anyhow::Result<Option<Preferences>> {
        let row = sqlx::query_as::<_, UserPreferencesRow>(
            "SELECT notifications, units, theme FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Preferences::from))
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> anyhow::Result<Option<Preferences>> {
        let row = sqlx::query_as::<_, UserPreferencesRow>(
            r#"UPDATE users
               SET notifications = COALESCE($2, notifications),
                   units         = COALESCE($3, units),
                   theme         = COALESCE($4, theme)
               WHERE id = $1
               RETURNING notifications, units, theme"#,
        )
        .bind(user_id)
        .bind(update.notifications)
        .bind(update.units)
        .bind(update.theme)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Preferences::from))
    }
}

// -- Activity Operations --

#[async_trait]
impl ActivityStore for PgStore {
    async fn insert_workout(&self, user_id: Uuid, workout: &NewWorkout) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO workouts (user_id, exercise_name, sets, reps, weights, notes, category, tags, date)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(workout.exercise_name.trim())
        .bind(workout.sets)
        .bind(workout.reps)
        .bind(workout.weights)
        .bind(&workout.notes)
        .bind(&workout.category)
        .bind(&workout.tags)
        .bind(workout.date.unwrap_or_else(Utc::now))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_progress(&self, user_id: Uuid, progress: &NewProgress) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO progress_entries (user_id, date, weight, measurements, performance)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(progress.date.unwrap_or_else(Utc::now))
        .bind(progress.weight)
        .bind(object_or_empty(&progress.measurements))
        .bind(object_or_empty(&progress.performance))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_nutrition(
        &self,
        user_id: Uuid,
        log: &NewNutritionLog,
    ) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO nutrition_logs (user_id, meal_type, food_items, date, notes)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(log.meal_type.trim())
        .bind(serde_json::to_value(&log.food_items)?)
        .bind(log.date.unwrap_or_else(Utc::now))
        .bind(&log.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}

fn object_or_empty(value: &serde_json::Value) -> serde_json::Value {
    if value.is_null() {
        serde_json::json!({})
    } else {
        value.clone()
    }
}
