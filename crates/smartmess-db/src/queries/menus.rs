use crate::Database;
use crate::models::MenuRow;
use crate::queries::{OptionalExt, parse_items};
use anyhow::Result;
use rusqlite::{Row, params};

pub struct MenuUpsert<'a> {
    /// Candidate id; kept only when the date is new.
    pub id: &'a str,
    pub date: &'a str,
    pub day: &'a str,
    pub breakfast: &'a [String],
    pub lunch: &'a [String],
    pub snacks: &'a [String],
    pub dinner: &'a [String],
    pub special_note: Option<&'a str>,
}

impl Database {
    /// One menu per calendar date: the UNIQUE(date) constraint plus this
    /// ON CONFLICT clause makes concurrent upserts collapse to a single row.
    pub fn upsert_menu(&self, menu: &MenuUpsert) -> Result<MenuRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO menus
                         (id, date, day, breakfast, lunch, snacks, dinner, special_note)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(date) DO UPDATE SET
                         day = excluded.day,
                         breakfast = excluded.breakfast,
                         lunch = excluded.lunch,
                         snacks = excluded.snacks,
                         dinner = excluded.dinner,
                         special_note = excluded.special_note,
                         updated_at = datetime('now','localtime')
                     RETURNING {MENU_COLS}"
                ),
                params![
                    menu.id,
                    menu.date,
                    menu.day,
                    serde_json::to_string(menu.breakfast)?,
                    serde_json::to_string(menu.lunch)?,
                    serde_json::to_string(menu.snacks)?,
                    serde_json::to_string(menu.dinner)?,
                    menu.special_note,
                ],
                menu_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn menu_by_date(&self, date: &str) -> Result<Option<MenuRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {MENU_COLS} FROM menus WHERE date = ?1"))?;
            stmt.query_row([date], menu_from_row).optional()
        })
    }

    pub fn menu_by_id(&self, id: &str) -> Result<Option<MenuRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {MENU_COLS} FROM menus WHERE id = ?1"))?;
            stmt.query_row([id], menu_from_row).optional()
        })
    }

    /// Menus with start <= date <= end, ascending.
    pub fn menus_between(&self, start: &str, end: &str) -> Result<Vec<MenuRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MENU_COLS} FROM menus
                 WHERE date >= ?1 AND date <= ?2
                 ORDER BY date ASC"
            ))?;
            let rows = stmt
                .query_map([start, end], menu_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_menus(&self) -> Result<Vec<MenuRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {MENU_COLS} FROM menus ORDER BY date DESC"))?;
            let rows = stmt
                .query_map([], menu_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial update by id; absent fields keep their stored value. That
    /// includes `special_note`: once set it survives partial updates, and is
    /// cleared by re-upserting the date without one (the upsert replaces
    /// every field).
    pub fn update_menu(
        &self,
        id: &str,
        breakfast: Option<&[String]>,
        lunch: Option<&[String]>,
        snacks: Option<&[String]>,
        dinner: Option<&[String]>,
        special_note: Option<&str>,
    ) -> Result<Option<MenuRow>> {
        self.with_conn(|conn| {
            let to_json = |items: Option<&[String]>| -> Result<Option<String>> {
                items.map(serde_json::to_string).transpose().map_err(Into::into)
            };
            conn.query_row(
                &format!(
                    "UPDATE menus SET
                         breakfast = COALESCE(?2, breakfast),
                         lunch = COALESCE(?3, lunch),
                         snacks = COALESCE(?4, snacks),
                         dinner = COALESCE(?5, dinner),
                         special_note = COALESCE(?6, special_note),
                         updated_at = datetime('now','localtime')
                     WHERE id = ?1
                     RETURNING {MENU_COLS}"
                ),
                params![
                    id,
                    to_json(breakfast)?,
                    to_json(lunch)?,
                    to_json(snacks)?,
                    to_json(dinner)?,
                    special_note,
                ],
                menu_from_row,
            )
            .optional()
        })
    }

    pub fn delete_menu(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM menus WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn count_menus(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM menus", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}

const MENU_COLS: &str =
    "id, date, day, breakfast, lunch, snacks, dinner, special_note, created_at, updated_at";

fn menu_from_row(row: &Row) -> rusqlite::Result<MenuRow> {
    Ok(MenuRow {
        id: row.get(0)?,
        date: row.get(1)?,
        day: row.get(2)?,
        breakfast: parse_items(&row.get::<_, String>(3)?),
        lunch: parse_items(&row.get::<_, String>(4)?),
        snacks: parse_items(&row.get::<_, String>(5)?),
        dinner: parse_items(&row.get::<_, String>(6)?),
        special_note: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert<'a>(id: &'a str, date: &'a str, breakfast: &'a [String]) -> MenuUpsert<'a> {
        MenuUpsert {
            id,
            date,
            day: "Wednesday",
            breakfast,
            lunch: &[],
            snacks: &[],
            dinner: &[],
            special_note: None,
        }
    }

    #[test]
    fn same_date_updates_in_place() {
        let db = Database::open_in_memory().unwrap();

        let first = vec!["Tea".to_string()];
        let created = db.upsert_menu(&upsert("m1", "2024-01-10", &first)).unwrap();
        assert_eq!(created.breakfast, first);

        let second = vec!["Tea".to_string(), "Toast".to_string()];
        let updated = db.upsert_menu(&upsert("m2", "2024-01-10", &second)).unwrap();
        assert_eq!(updated.id, "m1", "existing row keeps its id");
        assert_eq!(updated.breakfast, second);

        assert_eq!(db.count_menus().unwrap(), 1);
    }

    #[test]
    fn between_is_inclusive_and_ascending() {
        let db = Database::open_in_memory().unwrap();
        for (id, date) in [("a", "2024-01-12"), ("b", "2024-01-10"), ("c", "2024-01-20")] {
            db.upsert_menu(&upsert(id, date, &[])).unwrap();
        }

        let week = db.menus_between("2024-01-10", "2024-01-16").unwrap();
        let dates: Vec<&str> = week.iter().map(|m| m.date.as_str()).collect();
        assert_eq!(dates, ["2024-01-10", "2024-01-12"]);
    }

    #[test]
    fn partial_update_keeps_other_slots() {
        let db = Database::open_in_memory().unwrap();
        let breakfast = vec!["Idli".to_string()];
        db.upsert_menu(&upsert("m1", "2024-01-10", &breakfast)).unwrap();

        let lunch = vec!["Rice".to_string(), "Dal".to_string()];
        let updated = db
            .update_menu("m1", None, Some(&lunch), None, None, Some("Festival special"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.breakfast, breakfast);
        assert_eq!(updated.lunch, lunch);
        assert_eq!(updated.special_note.as_deref(), Some("Festival special"));

        assert!(db.update_menu("missing", None, None, None, None, None).unwrap().is_none());
    }

    #[test]
    fn special_note_survives_updates_and_clears_on_reupsert() {
        let db = Database::open_in_memory().unwrap();
        let mut menu = upsert("m1", "2024-01-10", &[]);
        menu.special_note = Some("Festival special");
        db.upsert_menu(&menu).unwrap();

        // A partial update without a note keeps the stored one.
        let updated = db
            .update_menu("m1", Some(&[]), None, None, None, None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.special_note.as_deref(), Some("Festival special"));

        // Re-upserting the date without a note clears it.
        let cleared = db.upsert_menu(&upsert("m2", "2024-01-10", &[])).unwrap();
        assert_eq!(cleared.id, "m1");
        assert!(cleared.special_note.is_none());
    }
}
