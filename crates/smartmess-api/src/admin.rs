use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use smartmess_db::queries::accounts::VerifyOutcome;
use smartmess_types::api::{DashboardStats, RegisterRequest, StudentWithRatings};

use crate::auth::{AppState, create_student_account, student_summary};
use crate::dates::{format_date, today_local};
use crate::error::{ApiError, with_db};
use crate::response::{created, ok, ok_list, ok_message, round1};

/// Headline numbers for the admin dashboard.
pub async fn dashboard_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let today = format_date(today_local());

    let stats = with_db(&state, move |db| {
        let (total_students, verified_students) = db.student_counts()?;
        let (total_ratings, avg_rating) = db.rating_totals()?;
        Ok(DashboardStats {
            total_students,
            verified_students,
            total_ratings,
            avg_rating: round1(avg_rating),
            today_ratings: db.count_ratings_on(&today)?,
            pending_complaints: db.count_complaints_with_status("pending")?,
            total_menus: db.count_menus()?,
        })
    })
    .await?;

    Ok(ok(stats))
}

/// Admin-created accounts go through the same path as self-registration and
/// start unverified all the same.
pub async fn add_student(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = create_student_account(&state, req).await?;
    Ok(created("Student added successfully", summary))
}

#[derive(Debug, Deserialize)]
pub struct ListStudentsQuery {
    pub verified: Option<bool>,
}

pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<ListStudentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, move |db| Ok(db.list_students(query.verified)?)).await?;

    let students: Vec<StudentWithRatings> = rows
        .into_iter()
        .map(|(row, ratings_count)| StudentWithRatings {
            student: student_summary(&row),
            ratings_count,
        })
        .collect();

    Ok(ok_list(students))
}

pub async fn verify_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = with_db(&state, move |db| Ok(db.verify_student(&id.to_string())?)).await?;

    match outcome {
        VerifyOutcome::Verified => {
            info!("Student {} verified", id);
            Ok(ok_message("Student verified successfully"))
        }
        VerifyOutcome::AlreadyVerified => Err(ApiError::Validation(
            "Student is already verified.".into(),
        )),
        VerifyOutcome::NotFound => Err(ApiError::NotFound("Student not found.")),
    }
}

pub async fn toggle_student_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let is_active = with_db(&state, move |db| {
        Ok(db.toggle_student_active(&id.to_string())?)
    })
    .await?
    .ok_or(ApiError::NotFound("Student not found."))?;

    info!("Student {} is_active set to {}", id, is_active);
    let message = if is_active {
        "Student account enabled"
    } else {
        "Student account disabled"
    };
    Ok(ok_message(message))
}

/// Hard delete; ratings, complaints, attendance, and read rows cascade.
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = with_db(&state, move |db| Ok(db.delete_student(&id.to_string())?)).await?;
    if !deleted {
        return Err(ApiError::NotFound("Student not found."));
    }
    info!("Student {} deleted", id);
    Ok(ok_message("Student deleted successfully"))
}
