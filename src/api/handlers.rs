use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::{Notification, Page};
use crate::models::preferences::{Preferences, PreferencesUpdate};
use crate::AppState;

// ── Request DTOs ─────────────────────────────────────────────

/// Query string for user-scoped reads. `userId` is kept as a raw string
/// so a missing or malformed value maps to a 400 with our error body.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body carrying the caller's `userId` for ownership checks.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: Option<String>,
}

fn parse_user_id(raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("userId required"))?;
    Uuid::parse_str(raw).map_err(|_| AppError::validation(format!("invalid userId: {}", raw)))
}

fn parse_notification_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation(format!("invalid notification id: {}", raw)))
}

/// A request without a JSON content type carries no body. Any other
/// rejection (bad syntax, wrong field types) is a 400.
fn optional_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<Option<T>, AppError> {
    match payload {
        Ok(Json(body)) => Ok(Some(body)),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(None),
        Err(e) => Err(AppError::validation(e.body_text())),
    }
}

/// `userId` from the JSON body, falling back to the query string.
fn owner_from(body: Option<UserRef>, query: &UserQuery) -> Result<Uuid, AppError> {
    let from_body = body.and_then(|b| b.user_id);
    parse_user_id(from_body.as_deref().or(query.user_id.as_deref()))
}

// ── Notification Handlers ────────────────────────────────────

/// GET /notifications — the user's notifications, newest first
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = parse_user_id(params.user_id.as_deref())?;
    let page = Page::new(params.limit, params.offset);

    let notifs = state.notifications.list(user_id, page).await?;
    Ok(Json(notifs))
}

/// GET /notifications/unread-count — count unread
pub async fn count_unread_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = parse_user_id(params.user_id.as_deref())?;
    let count = state.notifications.unread_count(user_id).await?;
    Ok(Json(json!({ "count": count })))
}

/// PUT|POST /notifications/:id — mark as read (idempotent)
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Query(params): Query<UserQuery>,
    body: Result<Json<UserRef>, JsonRejection>,
) -> Result<Json<Notification>, AppError> {
    let user_id = owner_from(optional_body(body)?, &params)?;
    let id = parse_notification_id(&id_str)?;

    let updated = state
        .notifications
        .mark_read(user_id, id)
        .await?
        .ok_or(AppError::NotFound("notification"))?;

    tracing::debug!(user_id = %user_id, notification_id = %id, "notification marked read");
    Ok(Json(updated))
}

/// POST /notifications/read-all — mark every unread notification read
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
    body: Result<Json<UserRef>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = owner_from(optional_body(body)?, &params)?;
    let updated = state.notifications.mark_all_read(user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// DELETE /notifications/:id — permanent
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Query(params): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = parse_user_id(params.user_id.as_deref())?;
    let id = parse_notification_id(&id_str)?;

    if !state.notifications.delete(user_id, id).await? {
        return Err(AppError::NotFound("notification"));
    }

    tracing::info!(user_id = %user_id, notification_id = %id, "notification deleted");
    Ok(Json(json!({ "message": "Deleted" })))
}

// ── Preference Handlers ──────────────────────────────────────

/// GET /preferences
pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Preferences>, AppError> {
    let user_id = parse_user_id(params.user_id.as_deref())?;
    let prefs = state
        .users
        .preferences(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(prefs))
}

/// PUT /preferences — partial update; unknown fields and enum values are rejected
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> Result<Json<Preferences>, AppError> {
    let Json(update) = payload.map_err(|e| AppError::validation(e.body_text()))?;
    let user_id = match update.user_id {
        Some(id) => id,
        None => return Err(AppError::validation("userId required")),
    };

    let prefs = if update.is_empty() {
        state.users.preferences(user_id).await?
    } else {
        state.users.update_preferences(user_id, &update).await?
    };
    let prefs = prefs.ok_or(AppError::NotFound("user"))?;

    tracing::info!(
        user_id = %user_id,
        notifications = prefs.notifications,
        "preferences updated"
    );
    Ok(Json(prefs))
}
