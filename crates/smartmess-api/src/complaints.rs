use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use smartmess_db::models::ComplaintRow;
use smartmess_types::api::{
    AdminComplaintPayload, ComplaintPayload, SubmitComplaintRequest, UpdateComplaintRequest,
};
use smartmess_types::models::{ComplaintCategory, ComplaintStatus, Priority};

use crate::auth::AppState;
use crate::error::{ApiError, with_db};
use crate::middleware::CurrentUser;
use crate::response::{created, ok, ok_list};

const MAX_SUBJECT_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;

pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SubmitComplaintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = ComplaintCategory::from_str(&req.category)
        .map_err(|_| ApiError::Validation("Invalid complaint category.".into()))?;
    let priority = match req.priority.as_deref() {
        None | Some("") => Priority::Medium,
        Some(raw) => Priority::from_str(raw)
            .map_err(|_| ApiError::Validation("Invalid priority. Expected low, medium or high.".into()))?,
    };

    let subject = req.subject.trim().to_string();
    let description = req.description.trim().to_string();
    if subject.is_empty() || description.is_empty() {
        return Err(ApiError::Validation(
            "Subject and description are required.".into(),
        ));
    }
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(ApiError::Validation(format!(
            "Subject must be at most {MAX_SUBJECT_LEN} characters."
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters."
        )));
    }

    let student_id = user.id.to_string();
    let id = Uuid::new_v4().to_string();
    let complaint = with_db(&state, move |db| {
        Ok(db.insert_complaint(
            &id,
            &student_id,
            category.as_str(),
            &subject,
            &description,
            priority.as_str(),
        )?)
    })
    .await?;

    Ok(created(
        "Complaint submitted successfully",
        complaint_payload(complaint),
    ))
}

pub async fn my_complaints(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    let rows = with_db(&state, move |db| Ok(db.complaints_by_student(&student_id)?)).await?;
    let payloads: Vec<ComplaintPayload> = rows.into_iter().map(complaint_payload).collect();
    Ok(ok_list(payloads))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    let complaint = with_db(&state, move |db| {
        Ok(db.complaint_by_id_owned(&id.to_string(), &student_id)?)
    })
    .await?
    .ok_or(ApiError::NotFound("Complaint not found."))?;

    Ok(ok(complaint_payload(complaint)))
}

#[derive(Debug, Deserialize)]
pub struct ListComplaintsQuery {
    pub status: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListComplaintsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            ComplaintStatus::from_str(raw)
                .map_err(|_| ApiError::Validation("Invalid complaint status.".into()))?,
        ),
    };

    let rows = with_db(&state, move |db| {
        Ok(db.list_complaints(status.map(|s| s.as_str()))?)
    })
    .await?;

    let payloads: Vec<AdminComplaintPayload> = rows
        .into_iter()
        .map(|r| AdminComplaintPayload {
            complaint: complaint_payload(r.complaint),
            student_name: r.student_name,
            student_email: r.student_email,
            roll_number: r.roll_number,
            hostel_name: r.hostel_name,
            room_number: r.room_number,
        })
        .collect();

    Ok(ok_list(payloads))
}

/// Status transition. `resolved_at` lives and dies with the resolved status;
/// the response text, once set, survives later transitions.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateComplaintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = ComplaintStatus::from_str(&req.status)
        .map_err(|_| ApiError::Validation("Invalid complaint status.".into()))?;
    let response = req
        .admin_response
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    let complaint = with_db(&state, move |db| {
        Ok(db.update_complaint_status(&id.to_string(), status.as_str(), response.as_deref())?)
    })
    .await?
    .ok_or(ApiError::NotFound("Complaint not found."))?;

    Ok(ok(complaint_payload(complaint)))
}

fn complaint_payload(row: ComplaintRow) -> ComplaintPayload {
    ComplaintPayload {
        id: row.id,
        category: row.category,
        subject: row.subject,
        description: row.description,
        priority: row.priority,
        status: row.status,
        admin_response: row.admin_response,
        resolved_at: row.resolved_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
