//! JSON response envelope: every success body carries `success: true` plus
//! a `data`, `count`+`data`, or `message` field.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};

pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub fn ok_list<T: Serialize>(items: Vec<T>) -> Json<Value> {
    Json(json!({ "success": true, "count": items.len(), "data": items }))
}

pub fn ok_message(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}

pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": message, "data": data })),
    )
}

/// Round to one decimal place, the precision used by every aggregate in the
/// API (average ratings, attendance rates).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_keeps_one_decimal() {
        assert_eq!(round1(3.14159), 3.1);
        assert_eq!(round1(66.6666), 66.7);
        assert_eq!(round1(0.0), 0.0);
    }
}
