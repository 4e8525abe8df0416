//! In-app notification records.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use shared::{Channel, Notification, NotificationPayload, NotificationStatus};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Store one delivery record per requested channel
/// POST /api/notifications
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NotificationPayload>,
) -> Result<(StatusCode, Json<Vec<Notification>>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("Notification title is required".to_string()));
    }

    let channels = if payload.channels.is_empty() {
        vec![Channel::InApp]
    } else {
        payload.channels.clone()
    };

    let mut created = Vec::with_capacity(channels.len());
    for channel in channels {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: payload.user_id,
            channel,
            kind: payload.kind.clone(),
            title: payload.title.clone(),
            message: payload.message.clone(),
            severity: payload.severity,
            action_url: payload.action_url.clone(),
            status: NotificationStatus::Unread,
            created_at: None,
        };
        state.db.create_notification(&notification).await?;
        created.push(notification);
    }

    tracing::debug!(user_id = %payload.user_id, count = created.len(), "Notifications recorded");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Notifications addressed to the user `:id`
/// GET /api/notifications/:id
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.db.list_notifications(user_id).await?))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.db.mark_notification_read(id).await? {
        return Err(AppError::NotFound("Notification".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
