//! Domain records whose creation triggers an activity notification.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Column widths in the `workouts` and `nutrition_logs` tables.
pub const MAX_EXERCISE_NAME_LEN: usize = 255;
pub const MAX_CATEGORY_LEN: usize = 64;
pub const MAX_MEAL_TYPE_LEN: usize = 64;

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkout {
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub exercise_name: String,
    pub sets: Option<i32>,
    pub reps: Option<i32>,
    pub weights: Option<f64>,
    pub notes: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub date: Option<DateTime<Utc>>,
}

impl NewWorkout {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.exercise_name.trim().is_empty() {
            return Err("exerciseName required");
        }
        if too_long(self.exercise_name.trim(), MAX_EXERCISE_NAME_LEN) {
            return Err("exerciseName must be at most 255 characters");
        }
        if self.category.as_deref().is_some_and(|c| too_long(c, MAX_CATEGORY_LEN)) {
            return Err("category must be at most 64 characters");
        }
        if self.sets.is_some_and(|s| s < 0) || self.reps.is_some_and(|r| r < 0) {
            return Err("sets and reps must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewProgress {
    pub user_id: Option<Uuid>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub date: Option<DateTime<Utc>>,
    pub weight: Option<f64>,
    #[serde(default)]
    pub measurements: serde_json::Value,
    #[serde(default)]
    pub performance: serde_json::Value,
}

impl NewProgress {
    pub fn validate(&self) -> Result<(), &'static str> {
        match self.weight {
            Some(w) if w.is_finite() && w > 0.0 => {}
            Some(_) => return Err("weight must be a positive number"),
            None => return Err("weight required"),
        }
        for v in [&self.measurements, &self.performance] {
            if !(v.is_null() || v.is_object()) {
                return Err("measurements and performance must be objects");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FoodItem {
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub proteins: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewNutritionLog {
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub meal_type: String,
    #[serde(default)]
    pub food_items: Vec<FoodItem>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewNutritionLog {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.meal_type.trim().is_empty() || self.food_items.is_empty() || self.date.is_none() {
            return Err("Invalid data");
        }
        if too_long(self.meal_type.trim(), MAX_MEAL_TYPE_LEN) {
            return Err("mealType must be at most 64 characters");
        }
        Ok(())
    }
}

/// What happened, with just enough data to render the notification text.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    Workout { exercise_name: String },
    Progress { weight: f64 },
    Nutrition { meal_type: String },
}

impl ActivityEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityEvent::Workout { .. } => "workout",
            ActivityEvent::Progress { .. } => "progress",
            ActivityEvent::Nutrition { .. } => "nutrition",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ActivityEvent::Workout { exercise_name } => {
                format!("Workout completed: {}", exercise_name)
            }
            ActivityEvent::Progress { weight } => {
                format!("New progress logged: Weight {}kg", weight)
            }
            ActivityEvent::Nutrition { meal_type } => {
                format!("New nutrition log for {}", meal_type)
            }
        }
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC),
/// which is what date inputs on the dashboard send.
fn flexible_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_templates() {
        let w = ActivityEvent::Workout { exercise_name: "Bench Press".into() };
        assert_eq!(w.message(), "Workout completed: Bench Press");

        let p = ActivityEvent::Progress { weight: 80.0 };
        assert_eq!(p.message(), "New progress logged: Weight 80kg");

        let p = ActivityEvent::Progress { weight: 72.5 };
        assert_eq!(p.message(), "New progress logged: Weight 72.5kg");

        let n = ActivityEvent::Nutrition { meal_type: "breakfast".into() };
        assert_eq!(n.message(), "New nutrition log for breakfast");
    }

    #[test]
    fn test_date_accepts_plain_day() {
        let w: NewWorkout = serde_json::from_str(
            r#"{"exerciseName": "Squat", "date": "2025-03-04"}"#,
        )
        .unwrap();
        assert_eq!(w.date.unwrap().to_rfc3339(), "2025-03-04T00:00:00+00:00");
    }

    #[test]
    fn test_date_rejects_garbage() {
        let res: Result<NewWorkout, _> =
            serde_json::from_str(r#"{"exerciseName": "Squat", "date": "yesterday"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_nutrition_requires_food_items() {
        let log: NewNutritionLog = serde_json::from_str(
            r#"{"mealType": "lunch", "foodItems": [], "date": "2025-03-04"}"#,
        )
        .unwrap();
        assert_eq!(log.validate(), Err("Invalid data"));
    }

    #[test]
    fn test_text_fields_fit_their_columns() {
        let mut w: NewWorkout = serde_json::from_str(r#"{"exerciseName": "Squat"}"#).unwrap();
        w.exercise_name = "a".repeat(MAX_EXERCISE_NAME_LEN);
        assert!(w.validate().is_ok());
        w.exercise_name.push('a');
        assert!(w.validate().is_err());

        w.exercise_name = "Squat".into();
        w.category = Some("é".repeat(MAX_CATEGORY_LEN));
        assert!(w.validate().is_ok(), "limits count characters, not bytes");
        w.category = Some("x".repeat(MAX_CATEGORY_LEN + 1));
        assert!(w.validate().is_err());

        let mut log: NewNutritionLog = serde_json::from_str(
            r#"{"mealType": "lunch", "foodItems": [{"name": "Rice"}], "date": "2025-03-04"}"#,
        )
        .unwrap();
        assert!(log.validate().is_ok());
        log.meal_type = "m".repeat(MAX_MEAL_TYPE_LEN + 1);
        assert_eq!(log.validate(), Err("mealType must be at most 64 characters"));
    }

    #[test]
    fn test_progress_requires_positive_weight() {
        let p: NewProgress = serde_json::from_str(r#"{"weight": -3}"#).unwrap();
        assert!(p.validate().is_err());
        let p: NewProgress = serde_json::from_str(r#"{"weight": 81.2}"#).unwrap();
        assert!(p.validate().is_ok());
    }
}
