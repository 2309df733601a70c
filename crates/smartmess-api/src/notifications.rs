use std::collections::HashSet;
use std::str::FromStr;

use axum::{
    Extension,
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use smartmess_db::models::NotificationRow;
use smartmess_types::api::{BroadcastRequest, NotificationPayload, UnreadCount};
use smartmess_types::models::NotificationType;

use crate::auth::AppState;
use crate::error::{ApiError, with_db};
use crate::middleware::CurrentUser;
use crate::response::{created, ok, ok_list, ok_message};

const MAX_TITLE_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 2000;

/// Active notifications newest first, each flagged with whether the calling
/// student has read it.
pub async fn list_for_student(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    let (rows, read_ids) = with_db(&state, move |db| {
        let rows = db.list_notifications(true)?;
        let read_ids = db.read_notification_ids(&student_id)?;
        Ok((rows, read_ids))
    })
    .await?;

    let read: HashSet<String> = read_ids.into_iter().collect();
    let payloads: Vec<NotificationPayload> = rows
        .into_iter()
        .map(|row| {
            let is_read = read.contains(&row.id);
            notification_payload(row, Some(is_read))
        })
        .collect();

    Ok(ok_list(payloads))
}

/// Idempotent: reading twice is fine; reading a missing notification is 404.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    with_db(&state, move |db| {
        match db.mark_notification_read(&id.to_string(), &student_id) {
            Ok(()) => Ok(()),
            Err(e) if smartmess_db::is_foreign_key_violation(&e) => {
                Err(ApiError::NotFound("Notification not found."))
            }
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    Ok(ok_message("Notification marked as read"))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    let (total, read) =
        with_db(&state, move |db| Ok(db.notification_counts(&student_id)?)).await?;

    Ok(ok(UnreadCount {
        total,
        read,
        unread: (total - read).max(0),
    }))
}

pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    let message = req.message.trim().to_string();
    if title.is_empty() || message.is_empty() {
        return Err(ApiError::Validation("Title and message are required.".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters."
        )));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters."
        )));
    }

    let kind = match req.kind.as_deref() {
        None | Some("") => NotificationType::Info,
        Some(raw) => NotificationType::from_str(raw).map_err(|_| {
            ApiError::Validation(
                "Invalid notification type. Expected info, success, warning or urgent.".into(),
            )
        })?,
    };

    let id = Uuid::new_v4().to_string();
    let row = with_db(&state, move |db| {
        Ok(db.insert_notification(&id, &title, &message, kind.as_str())?)
    })
    .await?;

    info!("Notification broadcast: {} ({})", row.title, row.id);
    Ok(created(
        "Notification sent successfully",
        notification_payload(row, None),
    ))
}

pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, move |db| Ok(db.list_notifications(false)?)).await?;
    let payloads: Vec<NotificationPayload> = rows
        .into_iter()
        .map(|row| notification_payload(row, None))
        .collect();
    Ok(ok_list(payloads))
}

/// Hard delete; read rows go with it via the cascade.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = with_db(&state, move |db| Ok(db.delete_notification(&id.to_string())?)).await?;
    if !deleted {
        return Err(ApiError::NotFound("Notification not found."));
    }
    Ok(ok_message("Notification deleted successfully"))
}

fn notification_payload(row: NotificationRow, is_read: Option<bool>) -> NotificationPayload {
    NotificationPayload {
        id: row.id,
        title: row.title,
        message: row.message,
        kind: row.kind,
        is_active: row.is_active,
        created_at: row.created_at,
        is_read,
    }
}
