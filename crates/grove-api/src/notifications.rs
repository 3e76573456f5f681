use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use grove_types::api::NotificationQuery;

use crate::error::ApiError;
use crate::extractors::{AnonymousId, ApiPath, ApiQuery};
use crate::state::{AppState, blocking, success};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

pub async fn list_notifications(
    State(state): State<AppState>,
    anonymous_id: AnonymousId,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let unread_only = query.unread_only.unwrap_or(false);

    let who = anonymous_id.0.clone();
    let page = blocking(&state, move |s| {
        s.db.list_notifications(&who, limit, offset, unread_only)
    })
    .await?;
    Ok(success(json!({
        "notifications": page.notifications,
        "total_count": page.total_count,
        "unread_count": page.unread_count,
        "anonymous_id": anonymous_id.0,
    })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    anonymous_id: AnonymousId,
) -> Result<impl IntoResponse, ApiError> {
    let who = anonymous_id.0.clone();
    let unread_count = blocking(&state, move |s| s.db.unread_count(&who)).await?;
    Ok(success(json!({
        "unread_count": unread_count,
        "anonymous_id": anonymous_id.0,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    ApiPath(notification_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
) -> Result<impl IntoResponse, ApiError> {
    let notification = blocking(&state, move |s| {
        s.db.mark_notification_read(notification_id, anonymous_id.as_str())
    })
    .await?;
    Ok(success(json!({ "notification": notification })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    anonymous_id: AnonymousId,
) -> Result<impl IntoResponse, ApiError> {
    let updated_count = blocking(&state, move |s| {
        s.db.mark_all_notifications_read(anonymous_id.as_str())
    })
    .await?;
    Ok(success(json!({
        "updated_count": updated_count,
        "message": format!("Marked {} notifications as read", updated_count),
    })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    ApiPath(notification_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| {
        s.db.delete_notification(notification_id, anonymous_id.as_str())
    })
    .await?;
    Ok(success(json!({ "message": "Notification deleted successfully" })))
}

/// Purge notifications older than the configured retention window.
pub async fn cleanup(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let deleted_count = blocking(&state, |s| {
        s.db.cleanup_notifications(Utc::now(), s.notification_retention_days)
    })
    .await?;
    Ok(success(json!({
        "deleted_count": deleted_count,
        "message": format!("Cleaned up {} old notifications", deleted_count),
    })))
}
