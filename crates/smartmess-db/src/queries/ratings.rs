use crate::Database;
use crate::models::{AdminRatingRow, MealRatingRow, RatingRow, StudentRatingRow};
use crate::queries::{OptionalExt, parse_items};
use anyhow::Result;
use rusqlite::{Row, params};

impl Database {
    /// Atomic upsert keyed on (student, menu, meal): resubmitting overwrites
    /// the rating and comment and bumps updated_at. The 1..=5 bound is also
    /// a CHECK constraint, so an out-of-range value can never be written.
    pub fn upsert_rating(
        &self,
        id: &str,
        student_id: &str,
        menu_id: &str,
        meal_type: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<RatingRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO ratings (id, student_id, menu_id, meal_type, rating, comment)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(student_id, menu_id, meal_type) DO UPDATE SET
                         rating = excluded.rating,
                         comment = excluded.comment,
                         updated_at = datetime('now','localtime')
                     RETURNING {RATING_COLS}"
                ),
                params![id, student_id, menu_id, meal_type, rating, comment],
                rating_from_row,
            )?;
            Ok(row)
        })
    }

    /// A student's ratings, newest first, joined with the menu date and the
    /// item list of the meal that was rated.
    pub fn ratings_by_student(&self, student_id: &str) -> Result<Vec<StudentRatingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.menu_id, r.meal_type, r.rating, r.comment,
                        m.date,
                        CASE r.meal_type
                            WHEN 'breakfast' THEN m.breakfast
                            WHEN 'lunch' THEN m.lunch
                            WHEN 'snacks' THEN m.snacks
                            ELSE m.dinner
                        END,
                        r.created_at, r.updated_at
                 FROM ratings r
                 JOIN menus m ON r.menu_id = m.id
                 WHERE r.student_id = ?1
                 ORDER BY r.created_at DESC",
            )?;
            let rows = stmt
                .query_map([student_id], |row| {
                    Ok(StudentRatingRow {
                        id: row.get(0)?,
                        menu_id: row.get(1)?,
                        meal_type: row.get(2)?,
                        rating: row.get(3)?,
                        comment: row.get(4)?,
                        menu_date: row.get(5)?,
                        menu_items: parse_items(&row.get::<_, String>(6)?),
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Owner-scoped fetch: a rating belonging to another student is
    /// indistinguishable from a missing one.
    pub fn rating_by_id_owned(&self, id: &str, student_id: &str) -> Result<Option<RatingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RATING_COLS} FROM ratings WHERE id = ?1 AND student_id = ?2"
            ))?;
            stmt.query_row([id, student_id], rating_from_row).optional()
        })
    }

    pub fn update_rating_owned(
        &self,
        id: &str,
        student_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE ratings SET rating = ?3, comment = ?4,
                     updated_at = datetime('now','localtime')
                 WHERE id = ?1 AND student_id = ?2",
                params![id, student_id, rating, comment],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_rating_owned(&self, id: &str, student_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM ratings WHERE id = ?1 AND student_id = ?2",
                params![id, student_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn meal_ratings(&self, menu_id: &str, meal_type: &str) -> Result<Vec<MealRatingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, s.name, r.rating, r.comment, r.created_at
                 FROM ratings r
                 JOIN students s ON r.student_id = s.id
                 WHERE r.menu_id = ?1 AND r.meal_type = ?2
                 ORDER BY r.created_at DESC",
            )?;
            let rows = stmt
                .query_map([menu_id, meal_type], |row| {
                    Ok(MealRatingRow {
                        id: row.get(0)?,
                        student_name: row.get(1)?,
                        rating: row.get(2)?,
                        comment: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// (average, count) for one meal of one menu; zero ratings average to 0.
    pub fn meal_average(&self, menu_id: &str, meal_type: &str) -> Result<(f64, i64)> {
        self.with_conn(|conn| {
            let pair = conn.query_row(
                "SELECT COALESCE(AVG(rating), 0), COUNT(*)
                 FROM ratings WHERE menu_id = ?1 AND meal_type = ?2",
                [menu_id, meal_type],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(pair)
        })
    }

    /// (meal_type, average, count) across all history.
    pub fn meal_type_averages(&self) -> Result<Vec<(String, f64, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT meal_type, AVG(rating), COUNT(*)
                 FROM ratings GROUP BY meal_type",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// (meal_type, rating value, count) triples for the distribution view.
    pub fn rating_distribution(&self) -> Result<Vec<(String, i64, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT meal_type, rating, COUNT(*)
                 FROM ratings GROUP BY meal_type, rating",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_all_ratings(
        &self,
        meal_type: Option<&str>,
        limit: u32,
    ) -> Result<Vec<AdminRatingRow>> {
        self.with_conn(|conn| {
            let filter = if meal_type.is_some() {
                "WHERE r.meal_type = ?1"
            } else {
                ""
            };
            let sql = format!(
                "SELECT r.id, s.name, s.email, s.roll_number, m.date,
                        r.meal_type, r.rating, r.comment, r.created_at
                 FROM ratings r
                 JOIN students s ON r.student_id = s.id
                 JOIN menus m ON r.menu_id = m.id
                 {filter}
                 ORDER BY r.created_at DESC
                 LIMIT {limit}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let map = |row: &Row| -> rusqlite::Result<AdminRatingRow> {
                Ok(AdminRatingRow {
                    id: row.get(0)?,
                    student_name: row.get(1)?,
                    student_email: row.get(2)?,
                    roll_number: row.get(3)?,
                    menu_date: row.get(4)?,
                    meal_type: row.get(5)?,
                    rating: row.get(6)?,
                    comment: row.get(7)?,
                    created_at: row.get(8)?,
                })
            };
            let rows = match meal_type {
                Some(meal) => stmt.query_map([meal], map)?.collect::<std::result::Result<Vec<_>, _>>()?,
                None => stmt.query_map([], map)?.collect::<std::result::Result<Vec<_>, _>>()?,
            };
            Ok(rows)
        })
    }

    /// (total count, overall average) for the dashboard.
    pub fn rating_totals(&self) -> Result<(i64, f64)> {
        self.with_conn(|conn| {
            let pair = conn.query_row(
                "SELECT COUNT(*), COALESCE(AVG(rating), 0) FROM ratings",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(pair)
        })
    }

    pub fn count_ratings_on(&self, date: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM ratings WHERE date(created_at) = ?1",
                [date],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

const RATING_COLS: &str =
    "id, student_id, menu_id, meal_type, rating, comment, created_at, updated_at";

fn rating_from_row(row: &Row) -> rusqlite::Result<RatingRow> {
    Ok(RatingRow {
        id: row.get(0)?,
        student_id: row.get(1)?,
        menu_id: row.get(2)?,
        meal_type: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::NewStudent;
    use crate::queries::menus::MenuUpsert;

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
        db.upsert_menu(&MenuUpsert {
            id: "m1",
            date: "2024-01-10",
            day: "Wednesday",
            breakfast: &[],
            lunch: &["Rice".to_string(), "Dal".to_string()],
            snacks: &[],
            dinner: &[],
            special_note: None,
        })
        .unwrap();
    }

    #[test]
    fn resubmission_overwrites_the_single_row() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.upsert_rating("r1", "s1", "m1", "lunch", 4, Some("ok")).unwrap();
        let second = db
            .upsert_rating("r2", "s1", "m1", "lunch", 2, Some("bad"))
            .unwrap();

        assert_eq!(second.id, "r1");
        assert_eq!(second.rating, 2);
        assert_eq!(second.comment.as_deref(), Some("bad"));

        let mine = db.ratings_by_student("s1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].menu_date, "2024-01-10");
        assert_eq!(mine[0].menu_items, ["Rice", "Dal"]);
    }

    #[test]
    fn out_of_range_rating_is_rejected_by_the_schema() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        assert!(db.upsert_rating("r1", "s1", "m1", "lunch", 6, None).is_err());
        assert!(db.upsert_rating("r1", "s1", "m1", "lunch", 0, None).is_err());
        assert!(db.ratings_by_student("s1").unwrap().is_empty());
    }

    #[test]
    fn empty_average_is_zero() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let (avg, count) = db.meal_average("m1", "dinner").unwrap();
        assert_eq!(avg, 0.0);
        assert_eq!(count, 0);

        db.upsert_rating("r1", "s1", "m1", "dinner", 5, None).unwrap();
        let (avg, count) = db.meal_average("m1", "dinner").unwrap();
        assert_eq!(avg, 5.0);
        assert_eq!(count, 1);
    }

    #[test]
    fn ownership_gates_update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.upsert_rating("r1", "s1", "m1", "lunch", 4, None).unwrap();

        assert!(!db.update_rating_owned("r1", "someone-else", 1, None).unwrap());
        assert!(!db.delete_rating_owned("r1", "someone-else").unwrap());
        assert!(db.rating_by_id_owned("r1", "someone-else").unwrap().is_none());

        assert!(db.update_rating_owned("r1", "s1", 3, Some("meh")).unwrap());
        assert!(db.delete_rating_owned("r1", "s1").unwrap());
        assert!(db.rating_by_id_owned("r1", "s1").unwrap().is_none());
    }
}
