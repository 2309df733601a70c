use crate::Database;
use crate::models::{ComplaintRow, ComplaintWithStudentRow};
use crate::queries::OptionalExt;
use anyhow::Result;
use rusqlite::{Row, params};

impl Database {
    pub fn insert_complaint(
        &self,
        id: &str,
        student_id: &str,
        category: &str,
        subject: &str,
        description: &str,
        priority: &str,
    ) -> Result<ComplaintRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO complaints
                         (id, student_id, category, subject, description, priority, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')
                     RETURNING {COMPLAINT_COLS}"
                ),
                params![id, student_id, category, subject, description, priority],
                complaint_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn complaints_by_student(&self, student_id: &str) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMPLAINT_COLS} FROM complaints
                 WHERE student_id = ?1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([student_id], complaint_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Owner-scoped fetch, same non-enumeration contract as ratings.
    pub fn complaint_by_id_owned(
        &self,
        id: &str,
        student_id: &str,
    ) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMPLAINT_COLS} FROM complaints WHERE id = ?1 AND student_id = ?2"
            ))?;
            stmt.query_row([id, student_id], complaint_from_row).optional()
        })
    }

    /// All complaints joined with the submitting student, optionally
    /// filtered by status, newest first.
    pub fn list_complaints(&self, status: Option<&str>) -> Result<Vec<ComplaintWithStudentRow>> {
        self.with_conn(|conn| {
            let filter = if status.is_some() { "WHERE c.status = ?1" } else { "" };
            let sql = format!(
                "SELECT c.id, c.student_id, c.category, c.subject, c.description,
                        c.priority, c.status, c.admin_response, c.resolved_at,
                        c.created_at, c.updated_at,
                        s.name, s.email, s.roll_number, s.hostel_name, s.room_number
                 FROM complaints c
                 JOIN students s ON c.student_id = s.id
                 {filter}
                 ORDER BY c.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let map = |row: &Row| -> rusqlite::Result<ComplaintWithStudentRow> {
                Ok(ComplaintWithStudentRow {
                    complaint: complaint_from_row(row)?,
                    student_name: row.get(11)?,
                    student_email: row.get(12)?,
                    roll_number: row.get(13)?,
                    hostel_name: row.get(14)?,
                    room_number: row.get(15)?,
                })
            };
            let rows = match status {
                Some(s) => stmt.query_map([s], map)?.collect::<std::result::Result<Vec<_>, _>>()?,
                None => stmt.query_map([], map)?.collect::<std::result::Result<Vec<_>, _>>()?,
            };
            Ok(rows)
        })
    }

    /// Status transition. resolved_at is set exactly when the new status is
    /// 'resolved' and cleared otherwise, keeping the invariant inside the
    /// UPDATE itself.
    pub fn update_complaint_status(
        &self,
        id: &str,
        status: &str,
        admin_response: Option<&str>,
    ) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE complaints SET
                         status = ?2,
                         admin_response = COALESCE(?3, admin_response),
                         resolved_at = CASE WHEN ?2 = 'resolved'
                                            THEN datetime('now','localtime')
                                            ELSE NULL END,
                         updated_at = datetime('now','localtime')
                     WHERE id = ?1
                     RETURNING {COMPLAINT_COLS}"
                ),
                params![id, status, admin_response],
                complaint_from_row,
            )
            .optional()
        })
    }

    pub fn count_complaints_with_status(&self, status: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM complaints WHERE status = ?1",
                [status],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

const COMPLAINT_COLS: &str = "id, student_id, category, subject, description, priority, \
     status, admin_response, resolved_at, created_at, updated_at";

fn complaint_from_row(row: &Row) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        student_id: row.get(1)?,
        category: row.get(2)?,
        subject: row.get(3)?,
        description: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        admin_response: row.get(7)?,
        resolved_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
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
    fn resolved_at_tracks_the_status() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        let complaint = db
            .insert_complaint("c1", "s1", "hygiene", "Dirty trays", "Trays unwashed", "high")
            .unwrap();
        assert_eq!(complaint.status, "pending");
        assert!(complaint.resolved_at.is_none());

        let resolved = db
            .update_complaint_status("c1", "resolved", Some("Cleaned and restocked"))
            .unwrap()
            .unwrap();
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.admin_response.as_deref(), Some("Cleaned and restocked"));

        // Moving away from resolved clears the timestamp
        let reopened = db
            .update_complaint_status("c1", "in-progress", None)
            .unwrap()
            .unwrap();
        assert!(reopened.resolved_at.is_none());
        assert_eq!(
            reopened.admin_response.as_deref(),
            Some("Cleaned and restocked"),
            "response text survives a status change"
        );
    }

    #[test]
    fn owner_scoping_hides_other_students_complaints() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.insert_complaint("c1", "s1", "service", "Slow queue", "...", "medium")
            .unwrap();

        assert!(db.complaint_by_id_owned("c1", "s1").unwrap().is_some());
        assert!(db.complaint_by_id_owned("c1", "other").unwrap().is_none());
    }

    #[test]
    fn status_filter_and_counts() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.insert_complaint("c1", "s1", "food_quality", "Cold food", "...", "medium")
            .unwrap();
        db.insert_complaint("c2", "s1", "quantity", "Small portions", "...", "low")
            .unwrap();
        db.update_complaint_status("c1", "rejected", None).unwrap();

        assert_eq!(db.list_complaints(Some("pending")).unwrap().len(), 1);
        assert_eq!(db.list_complaints(None).unwrap().len(), 2);
        assert_eq!(db.count_complaints_with_status("pending").unwrap(), 1);
    }
}
