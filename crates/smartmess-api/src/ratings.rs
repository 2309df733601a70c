use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use smartmess_db::models::RatingRow;
use smartmess_types::api::{
    AdminRatingPayload, MealAverage, MealRatingPayload, MealRatingStats, MyRatingPayload,
    RatingPayload, SubmitRatingRequest, UpdateRatingRequest,
};
use smartmess_types::models::MealType;

use crate::auth::AppState;
use crate::error::{ApiError, with_db};
use crate::middleware::CurrentUser;
use crate::response::{created, ok, ok_list, ok_message, round1};

const MAX_COMMENT_LEN: usize = 500;
const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 200;

/// One rating per (student, menu, meal): resubmitting replaces the earlier
/// score and comment rather than piling up rows.
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SubmitRatingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meal = parse_meal_type(&req.meal_type)?;
    validate_rating(req.rating)?;
    let comment = clean_comment(req.comment)?;

    let student_id = user.id.to_string();
    let rating_id = Uuid::new_v4().to_string();

    let rating = with_db(&state, move |db| {
        match db.upsert_rating(
            &rating_id,
            &student_id,
            &req.menu_id.to_string(),
            meal.as_str(),
            req.rating,
            comment.as_deref(),
        ) {
            Ok(row) => Ok(row),
            // The menus FK fails when the menu id points nowhere.
            Err(e) if smartmess_db::is_foreign_key_violation(&e) => {
                Err(ApiError::NotFound("Menu not found."))
            }
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    Ok(created("Rating submitted successfully", rating_payload(rating)))
}

pub async fn my_ratings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    let rows = with_db(&state, move |db| Ok(db.ratings_by_student(&student_id)?)).await?;

    let payloads: Vec<MyRatingPayload> = rows
        .into_iter()
        .map(|r| MyRatingPayload {
            id: r.id,
            menu_id: r.menu_id,
            meal_type: r.meal_type,
            rating: r.rating,
            comment: r.comment,
            menu_date: r.menu_date,
            menu_items: r.menu_items,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect();

    Ok(ok_list(payloads))
}

/// Another student's rating is indistinguishable from a missing one.
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    let rating = with_db(&state, move |db| {
        Ok(db.rating_by_id_owned(&id.to_string(), &student_id)?)
    })
    .await?
    .ok_or(ApiError::NotFound("Rating not found."))?;

    Ok(ok(rating_payload(rating)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRatingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_rating(req.rating)?;
    let comment = clean_comment(req.comment)?;

    let student_id = user.id.to_string();
    let rating = with_db(&state, move |db| {
        let id = id.to_string();
        if !db.update_rating_owned(&id, &student_id, req.rating, comment.as_deref())? {
            return Err(ApiError::NotFound("Rating not found."));
        }
        let row = db
            .rating_by_id_owned(&id, &student_id)?
            .ok_or(ApiError::NotFound("Rating not found."))?;
        Ok(row)
    })
    .await?;

    Ok(ok(rating_payload(rating)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = user.id.to_string();
    let deleted = with_db(&state, move |db| {
        Ok(db.delete_rating_owned(&id.to_string(), &student_id)?)
    })
    .await?;

    if !deleted {
        return Err(ApiError::NotFound("Rating not found."));
    }
    Ok(ok_message("Rating deleted successfully"))
}

/// All ratings for one meal of one menu, with the running average.
pub async fn meal_ratings(
    State(state): State<AppState>,
    Path((menu_id, meal_type)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let meal = parse_meal_type(&meal_type)?;

    let (rows, average, count) = with_db(&state, move |db| {
        let menu_id = menu_id.to_string();
        let rows = db.meal_ratings(&menu_id, meal.as_str())?;
        let (average, count) = db.meal_average(&menu_id, meal.as_str())?;
        Ok((rows, average, count))
    })
    .await?;

    let ratings: Vec<MealRatingPayload> = rows
        .into_iter()
        .map(|r| MealRatingPayload {
            id: r.id,
            student_name: r.student_name,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": count,
        "average": round1(average),
        "data": ratings,
    })))
}

/// Average and count per meal type across all history (admin).
pub async fn analytics_average(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, move |db| Ok(db.meal_type_averages()?)).await?;

    let averages: Vec<MealAverage> = rows
        .into_iter()
        .map(|(meal_type, average, count)| MealAverage {
            meal_type,
            average: round1(average),
            count,
        })
        .collect();

    Ok(ok_list(averages))
}

#[derive(Debug, Deserialize)]
pub struct ListRatingsQuery {
    pub meal_type: Option<String>,
    pub limit: Option<u32>,
}

pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<ListRatingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let meal = query
        .meal_type
        .as_deref()
        .map(parse_meal_type)
        .transpose()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let rows = with_db(&state, move |db| {
        Ok(db.list_all_ratings(meal.map(|m| m.as_str()), limit)?)
    })
    .await?;

    let payloads: Vec<AdminRatingPayload> = rows
        .into_iter()
        .map(|r| AdminRatingPayload {
            id: r.id,
            student_name: r.student_name,
            student_email: r.student_email,
            roll_number: r.roll_number,
            menu_date: r.menu_date,
            meal_type: r.meal_type,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        })
        .collect();

    Ok(ok_list(payloads))
}

/// Count, average, and per-value distribution for every meal type, with
/// zeros filled in so the client never sees a missing bucket.
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (averages, distribution) = with_db(&state, move |db| {
        Ok((db.meal_type_averages()?, db.rating_distribution()?))
    })
    .await?;

    let mut stats: BTreeMap<String, MealRatingStats> = MealType::ALL
        .iter()
        .map(|meal| {
            (
                meal.as_str().to_string(),
                MealRatingStats {
                    count: 0,
                    average: 0.0,
                    distribution: (1..=5).map(|v| (v.to_string(), 0)).collect(),
                },
            )
        })
        .collect();

    for (meal_type, average, count) in averages {
        if let Some(entry) = stats.get_mut(&meal_type) {
            entry.average = round1(average);
            entry.count = count;
        }
    }
    for (meal_type, value, count) in distribution {
        if let Some(entry) = stats.get_mut(&meal_type) {
            entry.distribution.insert(value.to_string(), count);
        }
    }

    Ok(ok(stats))
}

fn parse_meal_type(raw: &str) -> Result<MealType, ApiError> {
    MealType::from_str(raw).map_err(|_| {
        ApiError::Validation(
            "Invalid meal type. Expected breakfast, lunch, snacks or dinner.".into(),
        )
    })
}

fn validate_rating(rating: i64) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::Validation(
            "Rating must be between 1 and 5.".into(),
        ));
    }
    Ok(())
}

fn clean_comment(comment: Option<String>) -> Result<Option<String>, ApiError> {
    match comment {
        None => Ok(None),
        Some(c) => {
            let trimmed = c.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.chars().count() > MAX_COMMENT_LEN {
                return Err(ApiError::Validation(format!(
                    "Comment must be at most {MAX_COMMENT_LEN} characters."
                )));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

fn rating_payload(row: RatingRow) -> RatingPayload {
    RatingPayload {
        id: row.id,
        menu_id: row.menu_id,
        meal_type: row.meal_type,
        rating: row.rating,
        comment: row.comment,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn comments_are_trimmed_and_bounded() {
        assert_eq!(clean_comment(None).unwrap(), None);
        assert_eq!(clean_comment(Some("   ".into())).unwrap(), None);
        assert_eq!(
            clean_comment(Some("  tasty  ".into())).unwrap().as_deref(),
            Some("tasty")
        );
        assert!(clean_comment(Some("x".repeat(501))).is_err());
        assert!(clean_comment(Some("x".repeat(500))).is_ok());
    }

    #[test]
    fn meal_type_parsing_rejects_unknown_values() {
        assert!(parse_meal_type("lunch").is_ok());
        assert!(parse_meal_type("brunch").is_err());
        assert!(parse_meal_type("").is_err());
    }
}
