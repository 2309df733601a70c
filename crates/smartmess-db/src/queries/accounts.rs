use crate::Database;
use crate::models::{AdminRow, StudentRow};
use crate::queries::OptionalExt;
use anyhow::Result;
use rusqlite::{Connection, Row, params};

pub struct NewStudent<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub roll_number: &'a str,
    pub password_hash: &'a str,
    pub hostel_name: &'a str,
    pub room_number: &'a str,
    pub phone_number: &'a str,
}

pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    NotFound,
}

impl Database {
    // -- Students --

    /// Insert a new student. Duplicate email or roll number surfaces as a
    /// UNIQUE violation; the caller maps it to a conflict response.
    pub fn create_student(&self, student: &NewStudent) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO students
                     (id, name, email, roll_number, password,
                      hostel_name, room_number, phone_number,
                      is_verified, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 1)",
                params![
                    student.id,
                    student.name,
                    student.email,
                    student.roll_number,
                    student.password_hash,
                    student.hostel_name,
                    student.room_number,
                    student.phone_number,
                ],
            )?;
            Ok(())
        })
    }

    pub fn student_by_email(&self, email: &str) -> Result<Option<StudentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLS} FROM students WHERE email = ?1"
            ))?;
            stmt.query_row([email], student_from_row).optional()
        })
    }

    pub fn student_by_id(&self, id: &str) -> Result<Option<StudentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLS} FROM students WHERE id = ?1"
            ))?;
            stmt.query_row([id], student_from_row).optional()
        })
    }

    /// All students (optionally filtered by verification state), newest
    /// first, each with their total rating count.
    pub fn list_students(&self, verified: Option<bool>) -> Result<Vec<(StudentRow, i64)>> {
        self.with_conn(|conn| {
            let filter = match verified {
                Some(true) => "WHERE s.is_verified = 1",
                Some(false) => "WHERE s.is_verified = 0",
                None => "",
            };
            let sql = format!(
                "SELECT {cols},
                        (SELECT COUNT(*) FROM ratings r WHERE r.student_id = s.id)
                 FROM students s {filter}
                 ORDER BY s.created_at DESC",
                cols = STUDENT_COLS_QUALIFIED,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| Ok((student_from_row(row)?, row.get(11)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn verify_student(&self, id: &str) -> Result<VerifyOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE students SET is_verified = 1 WHERE id = ?1 AND is_verified = 0",
                [id],
            )?;
            if changed > 0 {
                return Ok(VerifyOutcome::Verified);
            }
            let exists: bool = conn
                .query_row("SELECT 1 FROM students WHERE id = ?1", [id], |_| Ok(true))
                .optional()?
                .unwrap_or(false);
            Ok(if exists {
                VerifyOutcome::AlreadyVerified
            } else {
                VerifyOutcome::NotFound
            })
        })
    }

    /// Flip `is_active` and return the new state, or None when the student
    /// does not exist.
    pub fn toggle_student_active(&self, id: &str) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE students SET is_active = 1 - is_active
                 WHERE id = ?1
                 RETURNING is_active",
                [id],
                |row| row.get::<_, bool>(0),
            )
            .optional()
        })
    }

    pub fn delete_student(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM students WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// (total, verified) student counts for the dashboard.
    pub fn student_counts(&self) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(is_verified), 0) FROM students",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(counts)
        })
    }

    pub fn count_active_verified_students(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM students WHERE is_active = 1 AND is_verified = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Students eligible for attendance, i.e. active and verified.
    pub fn active_verified_students(&self) -> Result<Vec<StudentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLS} FROM students
                 WHERE is_active = 1 AND is_verified = 1
                 ORDER BY name"
            ))?;
            let rows = stmt
                .query_map([], student_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Admins --

    pub fn create_admin(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admins (id, name, email, password, role)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, email, password_hash, role],
            )?;
            Ok(())
        })
    }

    pub fn admin_by_email(&self, email: &str) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| query_admin(conn, "email", email))
    }

    pub fn admin_by_id(&self, id: &str) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| query_admin(conn, "id", id))
    }

    pub fn count_admins(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}

const STUDENT_COLS: &str = "id, name, email, roll_number, password, hostel_name, \
     room_number, phone_number, is_verified, is_active, created_at";

const STUDENT_COLS_QUALIFIED: &str =
    "s.id, s.name, s.email, s.roll_number, s.password, s.hostel_name, \
     s.room_number, s.phone_number, s.is_verified, s.is_active, s.created_at";

fn student_from_row(row: &Row) -> rusqlite::Result<StudentRow> {
    Ok(StudentRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        roll_number: row.get(3)?,
        password: row.get(4)?,
        hostel_name: row.get(5)?,
        room_number: row.get(6)?,
        phone_number: row.get(7)?,
        is_verified: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn query_admin(conn: &Connection, column: &str, value: &str) -> Result<Option<AdminRow>> {
    let sql = format!(
        "SELECT id, name, email, password, role, created_at FROM admins WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], |row| {
        Ok(AdminRow {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    })
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;

    fn sample<'a>(id: &'a str, email: &'a str, roll: &'a str) -> NewStudent<'a> {
        NewStudent {
            id,
            name: "Asha Rao",
            email,
            roll_number: roll,
            password_hash: "argon2-hash",
            hostel_name: "North Block",
            room_number: "214",
            phone_number: "9876543210",
        }
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.create_student(&sample("s1", "asha@campus.edu", "21CS001"))
            .unwrap();

        let err = db
            .create_student(&sample("s2", "ASHA@campus.edu", "21CS002"))
            .unwrap_err();
        assert!(is_unique_violation(&err), "email compare is case-insensitive");

        let err = db
            .create_student(&sample("s3", "other@campus.edu", "21CS001"))
            .unwrap_err();
        assert!(is_unique_violation(&err), "roll number is unique");
    }

    #[test]
    fn verify_and_toggle_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        db.create_student(&sample("s1", "a@campus.edu", "R1")).unwrap();

        assert!(matches!(db.verify_student("s1").unwrap(), VerifyOutcome::Verified));
        assert!(matches!(
            db.verify_student("s1").unwrap(),
            VerifyOutcome::AlreadyVerified
        ));
        assert!(matches!(db.verify_student("nope").unwrap(), VerifyOutcome::NotFound));

        assert_eq!(db.toggle_student_active("s1").unwrap(), Some(false));
        assert_eq!(db.toggle_student_active("s1").unwrap(), Some(true));
        assert_eq!(db.toggle_student_active("nope").unwrap(), None);
    }

    #[test]
    fn eligible_students_require_both_flags() {
        let db = Database::open_in_memory().unwrap();
        db.create_student(&sample("s1", "a@campus.edu", "R1")).unwrap();
        db.create_student(&sample("s2", "b@campus.edu", "R2")).unwrap();
        db.verify_student("s1").unwrap();

        // s2 is unverified, so only s1 is eligible
        let eligible = db.active_verified_students().unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "s1");

        db.toggle_student_active("s1").unwrap();
        assert!(db.active_verified_students().unwrap().is_empty());
    }
}
