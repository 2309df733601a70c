use crate::Database;
use crate::models::AttendanceRow;
use anyhow::Result;
use rusqlite::{Row, params};

impl Database {
    /// Atomic upsert keyed on (student, date, meal): re-marking the same
    /// slot overwrites the status instead of adding a row.
    pub fn mark_attendance(
        &self,
        id: &str,
        student_id: &str,
        date: &str,
        meal_type: &str,
        status: &str,
    ) -> Result<AttendanceRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO meal_attendance (id, student_id, date, meal_type, status)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(student_id, date, meal_type) DO UPDATE SET
                         status = excluded.status,
                         marked_at = datetime('now','localtime')
                     RETURNING {ATTENDANCE_COLS}"
                ),
                params![id, student_id, date, meal_type, status],
                attendance_from_row,
            )?;
            Ok(row)
        })
    }

    /// One student's rows for a single date (at most four, one per meal).
    pub fn attendance_for_date(&self, student_id: &str, date: &str) -> Result<Vec<AttendanceRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTENDANCE_COLS} FROM meal_attendance
                 WHERE student_id = ?1 AND date = ?2"
            ))?;
            let rows = stmt
                .query_map([student_id, date], attendance_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Newest first, optionally bounded by an inclusive date range.
    pub fn attendance_history(
        &self,
        student_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<AttendanceRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {ATTENDANCE_COLS} FROM meal_attendance WHERE student_id = ?1"
            );
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&student_id];
            if let Some(start) = start_date.as_ref() {
                sql.push_str(&format!(" AND date >= ?{}", params.len() + 1));
                params.push(start);
            }
            if let Some(end) = end_date.as_ref() {
                sql.push_str(&format!(" AND date <= ?{}", params.len() + 1));
                params.push(end);
            }
            sql.push_str(" ORDER BY date DESC, meal_type");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), attendance_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every attendance row for a date, optionally narrowed to one meal.
    pub fn attendance_on(&self, date: &str, meal_type: Option<&str>) -> Result<Vec<AttendanceRow>> {
        self.with_conn(|conn| {
            let filter = if meal_type.is_some() { " AND meal_type = ?2" } else { "" };
            let sql = format!(
                "SELECT {ATTENDANCE_COLS} FROM meal_attendance WHERE date = ?1{filter}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = match meal_type {
                Some(meal) => stmt
                    .query_map([date, meal], attendance_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map([date], attendance_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            };
            Ok(rows)
        })
    }
}

const ATTENDANCE_COLS: &str = "id, student_id, date, meal_type, status, marked_at";

fn attendance_from_row(row: &Row) -> rusqlite::Result<AttendanceRow> {
    Ok(AttendanceRow {
        id: row.get(0)?,
        student_id: row.get(1)?,
        date: row.get(2)?,
        meal_type: row.get(3)?,
        status: row.get(4)?,
        marked_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::NewStudent;

    fn seed(db: &Database) {
        db.create_student(&NewStudent {
            id: "s1",
            name: "Asha Rao",
            email: "asha@campus.edu",
            roll_number: "21CS001",
            password_hash: "hash",
            hostel_name: "North Block",
            room_number: "214",
            phone_number: "9876543210",
        })
        .unwrap();
    }

    #[test]
    fn remarking_overwrites_the_slot() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.mark_attendance("a1", "s1", "2024-01-10", "dinner", "present").unwrap();
        let second = db
            .mark_attendance("a2", "s1", "2024-01-10", "dinner", "absent")
            .unwrap();

        assert_eq!(second.id, "a1");
        assert_eq!(second.status, "absent");
        assert_eq!(db.attendance_for_date("s1", "2024-01-10").unwrap().len(), 1);
    }

    #[test]
    fn history_bounds_are_inclusive() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        for (id, date) in [("a1", "2024-01-08"), ("a2", "2024-01-10"), ("a3", "2024-01-12")] {
            db.mark_attendance(id, "s1", date, "lunch", "present").unwrap();
        }

        let bounded = db
            .attendance_history("s1", Some("2024-01-08"), Some("2024-01-10"))
            .unwrap();
        let dates: Vec<&str> = bounded.iter().map(|a| a.date.as_str()).collect();
        assert_eq!(dates, ["2024-01-10", "2024-01-08"], "newest first");

        assert_eq!(db.attendance_history("s1", None, None).unwrap().len(), 3);
    }

    #[test]
    fn per_date_listing_can_filter_by_meal() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.mark_attendance("a1", "s1", "2024-01-10", "lunch", "present").unwrap();
        db.mark_attendance("a2", "s1", "2024-01-10", "dinner", "absent").unwrap();

        assert_eq!(db.attendance_on("2024-01-10", None).unwrap().len(), 2);
        let lunch = db.attendance_on("2024-01-10", Some("lunch")).unwrap();
        assert_eq!(lunch.len(), 1);
        assert_eq!(lunch[0].status, "present");
    }
}
