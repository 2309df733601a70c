use crate::Database;
use crate::models::NotificationRow;
use anyhow::Result;
use rusqlite::{Row, params};

impl Database {
    pub fn insert_notification(
        &self,
        id: &str,
        title: &str,
        message: &str,
        kind: &str,
    ) -> Result<NotificationRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO notifications (id, title, message, type)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {NOTIFICATION_COLS}"
                ),
                params![id, title, message, kind],
                notification_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn list_notifications(&self, only_active: bool) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let filter = if only_active { "WHERE is_active = 1" } else { "" };
            let sql = format!(
                "SELECT {NOTIFICATION_COLS} FROM notifications {filter}
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Ids of notifications this student has read.
    pub fn read_notification_ids(&self, student_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT notification_id FROM notification_reads WHERE student_id = ?1",
            )?;
            let ids = stmt
                .query_map([student_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Idempotent: marking an already-read notification is a no-op. A
    /// missing notification trips the foreign key, which the caller treats
    /// as not-found.
    pub fn mark_notification_read(&self, notification_id: &str, student_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notification_reads (notification_id, student_id)
                 VALUES (?1, ?2)
                 ON CONFLICT(notification_id, student_id) DO NOTHING",
                params![notification_id, student_id],
            )?;
            Ok(())
        })
    }

    /// (active total, read-of-active) for the unread badge.
    pub fn notification_counts(&self, student_id: &str) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE is_active = 1",
                [],
                |row| row.get(0),
            )?;
            let read: i64 = conn.query_row(
                "SELECT COUNT(*)
                 FROM notification_reads nr
                 JOIN notifications n ON nr.notification_id = n.id
                 WHERE nr.student_id = ?1 AND n.is_active = 1",
                [student_id],
                |row| row.get(0),
            )?;
            Ok((total, read))
        })
    }

    pub fn delete_notification(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM notifications WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

const NOTIFICATION_COLS: &str = "id, title, message, type, is_active, created_at";

fn notification_from_row(row: &Row) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        title: row.get(1)?,
        message: row.get(2)?,
        kind: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
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
    fn unread_count_is_total_minus_read() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.insert_notification("n1", "Mess closed", "Holiday on Friday", "urgent").unwrap();
        db.insert_notification("n2", "New menu", "Weekly menu is up", "info").unwrap();

        assert_eq!(db.notification_counts("s1").unwrap(), (2, 0));

        db.mark_notification_read("n1", "s1").unwrap();
        assert_eq!(db.notification_counts("s1").unwrap(), (2, 1));

        // Marking again is a no-op
        db.mark_notification_read("n1", "s1").unwrap();
        assert_eq!(db.notification_counts("s1").unwrap(), (2, 1));
        assert_eq!(db.read_notification_ids("s1").unwrap(), ["n1"]);
    }

    #[test]
    fn marking_a_missing_notification_fails() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        assert!(db.mark_notification_read("ghost", "s1").is_err());
    }

    #[test]
    fn deleting_a_notification_drops_its_reads() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.insert_notification("n1", "Title", "Body", "info").unwrap();
        db.mark_notification_read("n1", "s1").unwrap();

        assert!(db.delete_notification("n1").unwrap());
        assert_eq!(db.notification_counts("s1").unwrap(), (0, 0));
        assert!(db.read_notification_ids("s1").unwrap().is_empty());
    }
}
