use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PrincipalKind;

// -- JWT Claims --

/// JWT claims shared between token issuance (auth handlers) and verification
/// (the auth middleware). Canonical definition lives here in smartmess-types
/// to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub kind: PrincipalKind,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub roll_number: String,
    pub hostel_name: String,
    pub room_number: String,
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StudentSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub hostel_name: String,
    pub room_number: String,
    pub phone_number: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

// -- Menus --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertMenuRequest {
    pub date: String,
    #[serde(default)]
    pub breakfast: Vec<String>,
    #[serde(default)]
    pub lunch: Vec<String>,
    #[serde(default)]
    pub snacks: Vec<String>,
    #[serde(default)]
    pub dinner: Vec<String>,
    pub special_note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMenuRequest {
    pub breakfast: Option<Vec<String>>,
    pub lunch: Option<Vec<String>>,
    pub snacks: Option<Vec<String>>,
    pub dinner: Option<Vec<String>>,
    pub special_note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MenuPayload {
    pub id: String,
    pub date: String,
    pub day: String,
    pub breakfast: Vec<String>,
    pub lunch: Vec<String>,
    pub snacks: Vec<String>,
    pub dinner: Vec<String>,
    pub special_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// -- Ratings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitRatingRequest {
    pub menu_id: Uuid,
    pub meal_type: String,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRatingRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatingPayload {
    pub id: String,
    pub menu_id: String,
    pub meal_type: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A student's own rating joined with menu context for display.
#[derive(Debug, Serialize)]
pub struct MyRatingPayload {
    pub id: String,
    pub menu_id: String,
    pub meal_type: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub menu_date: String,
    pub menu_items: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct MealRatingPayload {
    pub id: String,
    pub student_name: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct AdminRatingPayload {
    pub id: String,
    pub student_name: String,
    pub student_email: String,
    pub roll_number: String,
    pub menu_date: String,
    pub meal_type: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct MealAverage {
    pub meal_type: String,
    pub average: f64,
    pub count: i64,
}

/// Per-meal aggregate: count, average, and how many ratings landed at each
/// value 1..=5 (keys are the rating values as strings).
#[derive(Debug, Serialize)]
pub struct MealRatingStats {
    pub count: i64,
    pub average: f64,
    pub distribution: BTreeMap<String, i64>,
}

// -- Complaints --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitComplaintRequest {
    pub category: String,
    pub subject: String,
    pub description: String,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateComplaintRequest {
    pub status: String,
    pub admin_response: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComplaintPayload {
    pub id: String,
    pub category: String,
    pub subject: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub admin_response: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct AdminComplaintPayload {
    #[serde(flatten)]
    pub complaint: ComplaintPayload,
    pub student_name: String,
    pub student_email: String,
    pub roll_number: String,
    pub hostel_name: String,
    pub room_number: String,
}

// -- Attendance --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkAttendanceRequest {
    /// `YYYY-MM-DD`; omitted means the server-local today.
    pub date: Option<String>,
    pub meal_type: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AttendancePayload {
    pub id: String,
    pub date: String,
    pub meal_type: String,
    pub status: String,
    pub marked_at: String,
}

#[derive(Debug, Serialize)]
pub struct AttendanceOverviewStudent {
    pub id: String,
    pub name: String,
    pub roll_number: String,
    pub hostel_name: String,
    pub room_number: String,
    /// Meal type -> "present" | "absent" | "not-marked".
    pub attendance: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct MealAttendanceStats {
    pub present: i64,
    pub absent: i64,
    pub not_marked: i64,
    /// present / eligible students, percent, one decimal. 0 when nobody
    /// is eligible.
    pub attendance_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct DailyAttendanceStat {
    pub date: String,
    pub day_name: String,
    pub total_students: i64,
    pub breakfast: i64,
    pub lunch: i64,
    pub snacks: i64,
    pub dinner: i64,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationPayload {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_active: bool,
    pub created_at: String,
    /// Present only in the student-facing listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub total: i64,
    pub read: i64,
    pub unread: i64,
}

// -- Admin dashboard --

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_students: i64,
    pub verified_students: i64,
    pub total_ratings: i64,
    pub avg_rating: f64,
    pub today_ratings: i64,
    pub pending_complaints: i64,
    pub total_menus: i64,
}

#[derive(Debug, Serialize)]
pub struct StudentWithRatings {
    #[serde(flatten)]
    pub student: StudentSummary,
    pub ratings_count: i64,
}
