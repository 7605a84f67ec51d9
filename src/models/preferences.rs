use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user settings. `notifications` gates every activity notification
/// and daily reminder for the user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub notifications: bool,
    pub units: Units,
    pub theme: Theme,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            units: Units::Metric,
            theme: Theme::Dark,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum Units {
    Metric,
    Imperial,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

/// Partial update from `PUT /preferences`. Unknown fields and unknown enum
/// values are rejected at deserialization.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferencesUpdate {
    pub user_id: Option<Uuid>,
    pub notifications: Option<bool>,
    pub units: Option<Units>,
    pub theme: Option<Theme>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_none() && self.units.is_none() && self.theme.is_none()
    }

    pub fn apply(&self, prefs: &mut Preferences) {
        if let Some(n) = self.notifications {
            prefs.notifications = n;
        }
        if let Some(u) = self.units {
            prefs.units = u;
        }
        if let Some(t) = self.theme {
            prefs.theme = t;
        }
    }
}

/// Row shape read from the user directory. `notifications` is `None` when
/// the flag was never set.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserPreferencesRow {
    pub notifications: Option<bool>,
    pub units: Units,
    pub theme: Theme,
}

impl From<UserPreferencesRow> for Preferences {
    fn from(row: UserPreferencesRow) -> Self {
        Self {
            notifications: row.notifications.unwrap_or(false),
            units: row.units,
            theme: row.theme,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub preferences: Preferences,
}
