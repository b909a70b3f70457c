use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use crate::engine::parity::week_start;

pub const DB_FILE_NAME: &str = "planner.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS academic_years(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_configs(
            academic_year_id TEXT PRIMARY KEY,
            periods_per_day INTEGER NOT NULL DEFAULT 8,
            FOREIGN KEY(academic_year_id) REFERENCES academic_years(id)
        )",
        [],
    )?;
    // week_zero arrived after the first schema; older workspaces get it backfilled.
    ensure_timetable_configs_week_zero(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            academic_year_id TEXT,
            FOREIGN KEY(academic_year_id) REFERENCES academic_years(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_slots(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            day INTEGER NOT NULL,
            period_start INTEGER NOT NULL,
            period_end INTEGER NOT NULL,
            week TEXT,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_slots_class ON timetable_slots(class_id, day, period_start)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS calendar_events(
            id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            title TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            affects_all_classes INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_calendar_events_range ON calendar_events(start_date, end_date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS modules(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lessons(
            id TEXT PRIMARY KEY,
            module_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            duration INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(module_id) REFERENCES modules(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lessons_module ON lessons(module_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS module_assignments(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            module_id TEXT NOT NULL,
            start_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id),
            FOREIGN KEY(module_id) REFERENCES modules(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_module_assignments_class ON module_assignments(class_id)",
        [],
    )?;

    // title/content/duration are copied from the lesson template at creation.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS scheduled_lessons(
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            lesson_id TEXT NOT NULL,
            calendar_date TEXT NOT NULL,
            timetable_slot_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            duration INTEGER NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(assignment_id) REFERENCES module_assignments(id),
            FOREIGN KEY(lesson_id) REFERENCES lessons(id),
            FOREIGN KEY(timetable_slot_id) REFERENCES timetable_slots(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scheduled_lessons_assignment ON scheduled_lessons(assignment_id, sort_order)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scheduled_lessons_date_slot ON scheduled_lessons(calendar_date, timetable_slot_id)",
        [],
    )?;

    Ok(())
}

/// Monday of the week the academic year starts in.
pub fn default_week_zero(academic_year_start: NaiveDate) -> NaiveDate {
    week_start(academic_year_start).unwrap_or(academic_year_start)
}

fn ensure_timetable_configs_week_zero(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "timetable_configs", "week_zero")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE timetable_configs ADD COLUMN week_zero TEXT", [])?;

    let mut stmt = conn.prepare(
        "SELECT tc.academic_year_id, ay.start_date
         FROM timetable_configs tc
         JOIN academic_years ay ON ay.id = tc.academic_year_id
         WHERE tc.week_zero IS NULL",
    )?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, NaiveDate>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (year_id, start) in rows {
        conn.execute(
            "UPDATE timetable_configs SET week_zero = ? WHERE academic_year_id = ?",
            params![default_week_zero(start), year_id],
        )?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("setting {} is not valid json", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        params![key, serde_json::to_string(value)?],
    )?;
    Ok(())
}
