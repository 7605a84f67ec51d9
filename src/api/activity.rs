//! Create endpoints for workouts, progress entries and nutrition logs.
//!
//! Each handler persists the record first and only then hands the event to
//! the emitter. Emission never changes the response.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::activity::{ActivityEvent, NewNutritionLog, NewProgress, NewWorkout};
use crate::AppState;

type Created = (StatusCode, Json<serde_json::Value>);

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::validation(e.body_text()))
}

async fn require_user(state: &AppState, raw: Option<Uuid>) -> Result<Uuid, AppError> {
    let user_id = raw.ok_or_else(|| AppError::validation("userId required"))?;
    if state.users.preferences(user_id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }
    Ok(user_id)
}

/// POST /workouts
pub async fn create_workout(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewWorkout>, JsonRejection>,
) -> Result<Created, AppError> {
    let workout = body(payload)?;
    workout.validate().map_err(AppError::validation)?;
    let user_id = require_user(&state, workout.user_id).await?;

    let id = state.activities.insert_workout(user_id, &workout).await?;

    let event = ActivityEvent::Workout {
        exercise_name: workout.exercise_name.trim().to_string(),
    };
    state.emitter.emit(user_id, &event).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Workout added", "id": id })),
    ))
}

/// POST /progress
pub async fn create_progress(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewProgress>, JsonRejection>,
) -> Result<Created, AppError> {
    let progress = body(payload)?;
    progress.validate().map_err(AppError::validation)?;
    let user_id = require_user(&state, progress.user_id).await?;

    let id = state.activities.insert_progress(user_id, &progress).await?;

    // validate() guarantees a weight
    if let Some(weight) = progress.weight {
        state
            .emitter
            .emit(user_id, &ActivityEvent::Progress { weight })
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Progress added", "id": id })),
    ))
}

/// POST /nutrition
pub async fn create_nutrition(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewNutritionLog>, JsonRejection>,
) -> Result<Created, AppError> {
    let log = body(payload)?;
    log.validate().map_err(AppError::validation)?;
    let user_id = require_user(&state, log.user_id).await?;

    let id = state.activities.insert_nutrition(user_id, &log).await?;

    let event = ActivityEvent::Nutrition {
        meal_type: log.meal_type.trim().to_string(),
    };
    state.emitter.emit(user_id, &event).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Created", "id": id })),
    ))
}
