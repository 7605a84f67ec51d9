use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user-facing alert. Only `is_read` changes after creation.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub r#type: NotificationType, // 'type' is a reserved keyword
    pub message: String,
    pub is_read: bool,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum NotificationType {
    Activity,
    Reminder,
    Alert,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Activity => "activity",
            NotificationType::Reminder => "reminder",
            NotificationType::Alert => "alert",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Insert payload for the notification store. `id` and `is_read` are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub r#type: NotificationType,
    pub message: String,
    pub date: DateTime<Utc>,
}

impl NewNotification {
    pub fn activity(user_id: Uuid, message: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            user_id,
            r#type: NotificationType::Activity,
            message: message.into(),
            date,
        }
    }

    /// Message must be non-empty after trimming.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.message.trim().is_empty() {
            anyhow::bail!("notification message must not be empty");
        }
        Ok(())
    }
}

/// A daily reminder for one user. `day` is the calendar day (in the
/// scheduler's timezone) the reminder covers and `day_start` its local
/// midnight as a UTC instant.
#[derive(Debug, Clone)]
pub struct DailyReminder {
    pub user_id: Uuid,
    pub day: NaiveDate,
    pub day_start: DateTime<Utc>,
    pub message: String,
    pub date: DateTime<Utc>,
}

/// Limit/offset window for list queries. `limit: None` returns everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 500;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.map(|l| l.clamp(0, Self::MAX_LIMIT)),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_serializes_camel_case() {
        let n = Notification {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            r#type: NotificationType::Activity,
            message: "Workout completed: Squat".into(),
            is_read: false,
            date: Utc::now(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "activity");
        assert_eq!(json["isRead"], false);
        assert!(json.get("userId").is_some());
        assert!(json.get("is_read").is_none());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let res: Result<NotificationType, _> = serde_json::from_str(r#""broadcast""#);
        assert!(res.is_err());
    }

    #[test]
    fn test_empty_message_rejected() {
        let n = NewNotification::activity(Uuid::new_v4(), "   ", Utc::now());
        assert!(n.validate().is_err());
    }

    #[test]
    fn test_page_clamps() {
        let p = Page::new(Some(10_000), Some(-4));
        assert_eq!(p.limit, Some(Page::MAX_LIMIT));
        assert_eq!(p.offset, 0);
        assert_eq!(Page::new(None, None), Page::default());
    }
}
