use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

// Timestamps use datetime('now','localtime') so that every stored date
// agrees with the canonical server-local calendar date used by the API.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS students (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            email        TEXT NOT NULL UNIQUE COLLATE NOCASE,
            roll_number  TEXT NOT NULL UNIQUE,
            password     TEXT NOT NULL,
            hostel_name  TEXT NOT NULL,
            room_number  TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            is_verified  INTEGER NOT NULL DEFAULT 0,
            is_active    INTEGER NOT NULL DEFAULT 1,
            created_at   TEXT NOT NULL DEFAULT (datetime('now','localtime'))
        );

        CREATE TABLE IF NOT EXISTS admins (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'admin'
                        CHECK (role IN ('admin','superadmin')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now','localtime'))
        );

        CREATE TABLE IF NOT EXISTS menus (
            id           TEXT PRIMARY KEY,
            date         TEXT NOT NULL UNIQUE,
            day          TEXT NOT NULL,
            breakfast    TEXT NOT NULL DEFAULT '[]',
            lunch        TEXT NOT NULL DEFAULT '[]',
            snacks       TEXT NOT NULL DEFAULT '[]',
            dinner       TEXT NOT NULL DEFAULT '[]',
            special_note TEXT,
            created_at   TEXT NOT NULL DEFAULT (datetime('now','localtime')),
            updated_at   TEXT NOT NULL DEFAULT (datetime('now','localtime'))
        );

        CREATE TABLE IF NOT EXISTS ratings (
            id          TEXT PRIMARY KEY,
            student_id  TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            menu_id     TEXT NOT NULL REFERENCES menus(id) ON DELETE CASCADE,
            meal_type   TEXT NOT NULL,
            rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment     TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now','localtime')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now','localtime')),
            UNIQUE(student_id, menu_id, meal_type)
        );

        CREATE INDEX IF NOT EXISTS idx_ratings_menu
            ON ratings(menu_id, meal_type);

        CREATE TABLE IF NOT EXISTS complaints (
            id             TEXT PRIMARY KEY,
            student_id     TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            category       TEXT NOT NULL,
            subject        TEXT NOT NULL,
            description    TEXT NOT NULL,
            priority       TEXT NOT NULL DEFAULT 'medium',
            status         TEXT NOT NULL DEFAULT 'pending',
            admin_response TEXT,
            resolved_at    TEXT,
            created_at     TEXT NOT NULL DEFAULT (datetime('now','localtime')),
            updated_at     TEXT NOT NULL DEFAULT (datetime('now','localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_complaints_student
            ON complaints(student_id, created_at);

        CREATE TABLE IF NOT EXISTS meal_attendance (
            id          TEXT PRIMARY KEY,
            student_id  TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            date        TEXT NOT NULL,
            meal_type   TEXT NOT NULL,
            status      TEXT NOT NULL,
            marked_at   TEXT NOT NULL DEFAULT (datetime('now','localtime')),
            UNIQUE(student_id, date, meal_type)
        );

        CREATE INDEX IF NOT EXISTS idx_attendance_date
            ON meal_attendance(date, meal_type);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            message     TEXT NOT NULL,
            type        TEXT NOT NULL DEFAULT 'info',
            is_active   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL DEFAULT (datetime('now','localtime'))
        );

        CREATE TABLE IF NOT EXISTS notification_reads (
            notification_id TEXT NOT NULL REFERENCES notifications(id) ON DELETE CASCADE,
            student_id      TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            read_at         TEXT NOT NULL DEFAULT (datetime('now','localtime')),
            PRIMARY KEY(notification_id, student_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
