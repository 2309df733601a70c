//! Database row types — these map to SQLite rows. Distinct from the
//! smartmess-types wire models to keep the DB layer independent.

pub struct StudentRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub password: String,
    pub hostel_name: String,
    pub room_number: String,
    pub phone_number: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: String,
}

pub struct AdminRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct MenuRow {
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

pub struct RatingRow {
    pub id: String,
    pub student_id: String,
    pub menu_id: String,
    pub meal_type: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Rating joined with its menu's date and the rated meal's item list.
pub struct StudentRatingRow {
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

pub struct MealRatingRow {
    pub id: String,
    pub student_name: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

/// Rating joined with student identity and menu date for the admin listing.
pub struct AdminRatingRow {
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

pub struct ComplaintRow {
    pub id: String,
    pub student_id: String,
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

pub struct ComplaintWithStudentRow {
    pub complaint: ComplaintRow,
    pub student_name: String,
    pub student_email: String,
    pub roll_number: String,
    pub hostel_name: String,
    pub room_number: String,
}

pub struct AttendanceRow {
    pub id: String,
    pub student_id: String,
    pub date: String,
    pub meal_type: String,
    pub status: String,
    pub marked_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_active: bool,
    pub created_at: String,
}
