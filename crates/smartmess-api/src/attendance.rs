use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use smartmess_db::models::AttendanceRow;
use smartmess_types::api::{
    AttendanceOverviewStudent, AttendancePayload, DailyAttendanceStat, MarkAttendanceRequest,
    MealAttendanceStats,
};
use smartmess_types::models::{AttendanceStatus, MealType};

use crate::auth::AppState;
use crate::dates::{format_date, parse_date, short_day_name, today_local};
use crate::error::{ApiError, with_db};
use crate::middleware::CurrentUser;
use crate::response::{ok, ok_list, round1};

const NOT_MARKED: &str = "not-marked";

/// One row per (student, date, meal): re-marking flips the status in place.
pub async fn mark(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<MarkAttendanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meal = MealType::from_str(&req.meal_type).map_err(|_| {
        ApiError::Validation(
            "Invalid meal type. Expected breakfast, lunch, snacks or dinner.".into(),
        )
    })?;
    let status = AttendanceStatus::from_str(&req.status)
        .map_err(|_| ApiError::Validation("Status must be present or absent.".into()))?;

    let date = match req.date.as_deref() {
        None | Some("") => today_local(),
        Some(raw) => parse_date(raw)?,
    };
    let date = format_date(date);

    let student_id = user.id.to_string();
    let id = Uuid::new_v4().to_string();
    let row = with_db(&state, move |db| {
        Ok(db.mark_attendance(&id, &student_id, &date, meal.as_str(), status.as_str())?)
    })
    .await?;

    Ok(ok(attendance_payload(row)))
}

/// Today's status per meal: "present", "absent", or null when unmarked.
pub async fn today_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let date = format_date(today_local());
    let student_id = user.id.to_string();
    let rows = {
        let date = date.clone();
        with_db(&state, move |db| {
            Ok(db.attendance_for_date(&student_id, &date)?)
        })
        .await?
    };

    let marked: HashMap<String, String> = rows
        .into_iter()
        .map(|r| (r.meal_type, r.status))
        .collect();

    let meals: BTreeMap<&str, Option<&String>> = MealType::ALL
        .iter()
        .map(|meal| (meal.as_str(), marked.get(meal.as_str())))
        .collect();

    Ok(Json(json!({
        "success": true,
        "date": date,
        "data": meals,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let start = validate_bound(query.start_date)?;
    let end = validate_bound(query.end_date)?;

    let student_id = user.id.to_string();
    let rows = with_db(&state, move |db| {
        Ok(db.attendance_history(&student_id, start.as_deref(), end.as_deref())?)
    })
    .await?;

    let payloads: Vec<AttendancePayload> = rows.into_iter().map(attendance_payload).collect();
    Ok(ok_list(payloads))
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub date: Option<String>,
    pub meal_type: Option<String>,
}

/// Admin overview: every active verified student against one date, with
/// per-meal statuses defaulting to not-marked, plus per-meal roll-ups.
pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = match query.date.as_deref() {
        None | Some("") => today_local(),
        Some(raw) => parse_date(raw)?,
    };
    let date = format_date(date);

    let meal_filter = match query.meal_type.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(MealType::from_str(raw).map_err(|_| {
            ApiError::Validation(
                "Invalid meal type. Expected breakfast, lunch, snacks or dinner.".into(),
            )
        })?),
    };

    let (students, rows) = {
        let date = date.clone();
        with_db(&state, move |db| {
            let students = db.active_verified_students()?;
            let rows = db.attendance_on(&date, meal_filter.map(|m| m.as_str()))?;
            Ok((students, rows))
        })
        .await?
    };

    // (student_id, meal_type) -> status
    let mut marked: HashMap<(String, String), String> = HashMap::new();
    for row in rows {
        marked.insert((row.student_id, row.meal_type), row.status);
    }

    let meals: Vec<MealType> = match meal_filter {
        Some(meal) => vec![meal],
        None => MealType::ALL.to_vec(),
    };

    let eligible = students.len() as i64;
    let mut stats: BTreeMap<String, MealAttendanceStats> = BTreeMap::new();
    let mut overview: Vec<AttendanceOverviewStudent> = Vec::with_capacity(students.len());

    for student in &students {
        let mut attendance = BTreeMap::new();
        for meal in &meals {
            let status = marked
                .get(&(student.id.clone(), meal.as_str().to_string()))
                .map(String::as_str)
                .unwrap_or(NOT_MARKED);
            attendance.insert(meal.as_str().to_string(), status.to_string());
        }
        overview.push(AttendanceOverviewStudent {
            id: student.id.clone(),
            name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            hostel_name: student.hostel_name.clone(),
            room_number: student.room_number.clone(),
            attendance,
        });
    }

    for meal in &meals {
        let mut present = 0;
        let mut absent = 0;
        for student in &students {
            match marked
                .get(&(student.id.clone(), meal.as_str().to_string()))
                .map(String::as_str)
            {
                Some("present") => present += 1,
                Some("absent") => absent += 1,
                _ => {}
            }
        }
        let rate = if eligible > 0 {
            round1(present as f64 / eligible as f64 * 100.0)
        } else {
            0.0
        };
        stats.insert(
            meal.as_str().to_string(),
            MealAttendanceStats {
                present,
                absent,
                not_marked: eligible - present - absent,
                attendance_rate: rate,
            },
        );
    }

    Ok(Json(json!({
        "success": true,
        "date": date,
        "total_students": eligible,
        "stats": stats,
        "data": overview,
    })))
}

/// Present counts per meal for each of the last seven days, oldest first.
pub async fn weekly_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let today = today_local();

    let (total_students, per_day) = with_db(&state, move |db| {
        let total = db.count_active_verified_students()?;
        let mut per_day = Vec::with_capacity(7);
        for offset in (0..7).rev() {
            let date = today - chrono::Duration::days(offset);
            let rows = db.attendance_on(&format_date(date), None)?;
            per_day.push((date, rows));
        }
        Ok((total, per_day))
    })
    .await?;

    let stats: Vec<DailyAttendanceStat> = per_day
        .into_iter()
        .map(|(date, rows)| {
            let mut counts: HashMap<&str, i64> = HashMap::new();
            for row in rows.iter().filter(|r| r.status == "present") {
                *counts.entry(row.meal_type.as_str()).or_default() += 1;
            }
            DailyAttendanceStat {
                date: format_date(date),
                day_name: short_day_name(date),
                total_students,
                breakfast: counts.get("breakfast").copied().unwrap_or(0),
                lunch: counts.get("lunch").copied().unwrap_or(0),
                snacks: counts.get("snacks").copied().unwrap_or(0),
                dinner: counts.get("dinner").copied().unwrap_or(0),
            }
        })
        .collect();

    Ok(ok_list(stats))
}

fn validate_bound(raw: Option<String>) -> Result<Option<String>, ApiError> {
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(format_date(parse_date(s)?))),
    }
}

fn attendance_payload(row: AttendanceRow) -> AttendancePayload {
    AttendancePayload {
        id: row.id,
        date: row.date,
        meal_type: row.meal_type,
        status: row.status,
        marked_at: row.marked_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::Value;

    use smartmess_db::Database;
    use smartmess_db::queries::accounts::NewStudent;

    use crate::auth::AppStateInner;

    #[test]
    fn history_bounds_must_be_iso_dates() {
        assert_eq!(validate_bound(None).unwrap(), None);
        assert_eq!(validate_bound(Some(String::new())).unwrap(), None);
        assert_eq!(
            validate_bound(Some("2024-01-10".into())).unwrap().as_deref(),
            Some("2024-01-10")
        );
        assert!(validate_bound(Some("10/01/2024".into())).is_err());
    }

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
        })
    }

    fn add_student(db: &Database, id: &str, email: &str, roll: &str) {
        db.create_student(&NewStudent {
            id,
            name: "Student",
            email,
            roll_number: roll,
            password_hash: "hash",
            hostel_name: "North Block",
            room_number: "101",
            phone_number: "9876543210",
        })
        .unwrap();
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn overview_defaults_unmarked_meals_and_computes_rates() {
        let state = test_state();
        for (id, email, roll) in [
            ("s1", "a@campus.edu", "R1"),
            ("s2", "b@campus.edu", "R2"),
            ("s3", "c@campus.edu", "R3"),
        ] {
            add_student(&state.db, id, email, roll);
            state.db.verify_student(id).unwrap();
        }
        // Unverified, so not eligible; must not appear anywhere below.
        add_student(&state.db, "s4", "d@campus.edu", "R4");

        state
            .db
            .mark_attendance("a1", "s1", "2024-01-10", "lunch", "present")
            .unwrap();
        state
            .db
            .mark_attendance("a2", "s2", "2024-01-10", "lunch", "absent")
            .unwrap();

        let query = OverviewQuery {
            date: Some("2024-01-10".into()),
            meal_type: None,
        };
        let response = overview(State(state), Query(query))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["total_students"], 3);

        let lunch = &body["stats"]["lunch"];
        assert_eq!(lunch["present"], 1);
        assert_eq!(lunch["absent"], 1);
        assert_eq!(lunch["not_marked"], 1);
        assert_eq!(lunch["attendance_rate"], 33.3);

        // Nobody marked dinner at all.
        let dinner = &body["stats"]["dinner"];
        assert_eq!(dinner["present"], 0);
        assert_eq!(dinner["not_marked"], 3);
        assert_eq!(dinner["attendance_rate"], 0.0);

        let students = body["data"].as_array().unwrap();
        assert_eq!(students.len(), 3, "unverified students are excluded");
        let s3 = students.iter().find(|s| s["id"] == "s3").unwrap();
        assert_eq!(s3["attendance"]["lunch"], "not-marked");
        assert_eq!(s3["attendance"]["breakfast"], "not-marked");
    }

    #[tokio::test]
    async fn overview_with_no_eligible_students_reports_zero_rates() {
        let state = test_state();
        let query = OverviewQuery {
            date: Some("2024-01-10".into()),
            meal_type: None,
        };
        let response = overview(State(state), Query(query))
            .await
            .unwrap()
            .into_response();
        let body = body_json(response).await;

        assert_eq!(body["total_students"], 0);
        assert_eq!(body["stats"]["breakfast"]["attendance_rate"], 0.0);
        assert_eq!(body["stats"]["lunch"]["not_marked"], 0);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weekly_trend_spans_seven_days_oldest_first() {
        let state = test_state();
        add_student(&state.db, "s1", "a@campus.edu", "R1");
        state.db.verify_student("s1").unwrap();

        let today = format_date(today_local());
        let yesterday = format_date(today_local() - chrono::Duration::days(1));
        state
            .db
            .mark_attendance("a1", "s1", &today, "breakfast", "present")
            .unwrap();
        state
            .db
            .mark_attendance("a2", "s1", &today, "dinner", "absent")
            .unwrap();
        state
            .db
            .mark_attendance("a3", "s1", &yesterday, "lunch", "present")
            .unwrap();

        let response = weekly_stats(State(state)).await.unwrap().into_response();
        let body = body_json(response).await;

        let days = body["data"].as_array().unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(
            days[0]["date"],
            format_date(today_local() - chrono::Duration::days(6))
        );
        assert_eq!(days[6]["date"], today);
        assert_eq!(days[6]["total_students"], 1);
        assert_eq!(days[6]["breakfast"], 1);
        assert_eq!(days[6]["dinner"], 0, "absent rows do not count as present");
        assert_eq!(days[5]["lunch"], 1);
        assert_eq!(days[5]["breakfast"], 0);
    }
}
