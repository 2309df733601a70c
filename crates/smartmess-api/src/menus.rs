use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use smartmess_db::models::MenuRow;
use smartmess_db::queries::menus::MenuUpsert;
use smartmess_types::api::{MenuPayload, UpdateMenuRequest, UpsertMenuRequest};

use crate::auth::AppState;
use crate::dates::{day_name, format_date, parse_date, today_local};
use crate::error::{ApiError, with_db};
use crate::response::{ok, ok_list, ok_message};

pub async fn get_today(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let date = format_date(today_local());
    menu_for_date(&state, date).await
}

/// An unparseable date gets the same success-with-null as a date with no
/// menu; either way there is nothing to show.
pub async fn get_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match parse_date(&date) {
        Ok(parsed) => menu_for_date(&state, format_date(parsed)).await,
        Err(_) => Ok(Json(json!({ "success": true, "data": serde_json::Value::Null }))),
    }
}

/// No menu for the day is an ordinary outcome, not an error.
async fn menu_for_date(state: &AppState, date: String) -> Result<Json<serde_json::Value>, ApiError> {
    let menu = with_db(state, move |db| Ok(db.menu_by_date(&date)?)).await?;
    Ok(Json(json!({
        "success": true,
        "data": menu.map(menu_payload),
    })))
}

/// Rolling seven-day window: today through today + 6, ascending.
pub async fn get_weekly(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let start = today_local();
    let end = start + chrono::Duration::days(6);
    let (start, end) = (format_date(start), format_date(end));

    let menus = with_db(&state, move |db| Ok(db.menus_between(&start, &end)?)).await?;
    let payloads: Vec<MenuPayload> = menus.into_iter().map(menu_payload).collect();
    Ok(ok_list(payloads))
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let menus = with_db(&state, move |db| Ok(db.list_menus()?)).await?;
    let payloads: Vec<MenuPayload> = menus.into_iter().map(menu_payload).collect();
    Ok(ok_list(payloads))
}

/// One menu per calendar date. Posting an existing date replaces that day's
/// menu in place; the day-of-week label always comes from the date itself.
pub async fn upsert(
    State(state): State<AppState>,
    Json(req): Json<UpsertMenuRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let date = parse_date(&req.date)?;
    let date_str = format_date(date);
    let day = day_name(date);
    let id = Uuid::new_v4().to_string();

    let menu = with_db(&state, move |db| {
        let row = db.upsert_menu(&MenuUpsert {
            id: &id,
            date: &date_str,
            day: &day,
            breakfast: &req.breakfast,
            lunch: &req.lunch,
            snacks: &req.snacks,
            dinner: &req.dinner,
            special_note: req.special_note.as_deref(),
        })?;
        Ok(row)
    })
    .await?;

    info!("Menu saved for {} ({})", menu.date, menu.id);
    Ok(ok(menu_payload(menu)))
}

/// Partial update: omitted fields keep their stored values, the note
/// included. Clearing the note is done by re-posting the day's menu, which
/// replaces every field.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMenuRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let menu = with_db(&state, move |db| {
        Ok(db.update_menu(
            &id.to_string(),
            req.breakfast.as_deref(),
            req.lunch.as_deref(),
            req.snacks.as_deref(),
            req.dinner.as_deref(),
            req.special_note.as_deref(),
        )?)
    })
    .await?
    .ok_or(ApiError::NotFound("Menu not found."))?;

    Ok(ok(menu_payload(menu)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = with_db(&state, move |db| Ok(db.delete_menu(&id.to_string())?)).await?;
    if !deleted {
        return Err(ApiError::NotFound("Menu not found."));
    }
    Ok(ok_message("Menu deleted successfully"))
}

fn menu_payload(row: MenuRow) -> MenuPayload {
    MenuPayload {
        id: row.id,
        date: row.date,
        day: row.day,
        breakfast: row.breakfast,
        lunch: row.lunch,
        snacks: row.snacks,
        dinner: row.dinner,
        special_note: row.special_note,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
