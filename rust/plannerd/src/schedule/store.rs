use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::engine::{Blackout, BlackoutKind, SlotSpec, WeekLabel};

#[derive(Debug, Clone)]
pub struct ClassRow {
    pub id: String,
    pub name: String,
    pub academic_year_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AcademicYearRow {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct TimetableConfigRow {
    pub academic_year_id: String,
    pub periods_per_day: i64,
    pub week_zero: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ModuleRow {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct LessonRow {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub content: String,
    pub duration: i64,
    pub sort_order: i64,
}

#[derive(Debug, Clone)]
pub struct CalendarEventRow {
    pub id: String,
    pub kind: BlackoutKind,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Stored and reported, but every event blocks every class.
    pub affects_all_classes: bool,
}

impl CalendarEventRow {
    pub fn blackout(&self) -> Blackout {
        Blackout::new(self.kind, self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledLessonRow {
    pub id: String,
    pub assignment_id: String,
    pub lesson_id: String,
    pub class_id: String,
    pub calendar_date: NaiveDate,
    pub timetable_slot_id: String,
    pub title: String,
    pub content: String,
    pub duration: i64,
    pub sort_order: i64,
}

fn conversion_failure(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn week_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<WeekLabel>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => WeekLabel::parse(&raw)
            .map(Some)
            .ok_or_else(|| conversion_failure(idx, format!("unknown week label {}", raw))),
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarEventRow> {
    let raw_kind: String = row.get(1)?;
    let kind = BlackoutKind::parse(&raw_kind)
        .ok_or_else(|| conversion_failure(1, format!("unknown event type {}", raw_kind)))?;
    Ok(CalendarEventRow {
        id: row.get(0)?,
        kind,
        title: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        affects_all_classes: row.get::<_, i64>(5)? != 0,
    })
}

const SCHEDULED_SELECT: &str = "SELECT sl.id, sl.assignment_id, sl.lesson_id, ma.class_id, sl.calendar_date,
        sl.timetable_slot_id, sl.title, sl.content, sl.duration, sl.sort_order
     FROM scheduled_lessons sl
     JOIN module_assignments ma ON ma.id = sl.assignment_id";

fn scheduled_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledLessonRow> {
    Ok(ScheduledLessonRow {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        lesson_id: row.get(2)?,
        class_id: row.get(3)?,
        calendar_date: row.get(4)?,
        timetable_slot_id: row.get(5)?,
        title: row.get(6)?,
        content: row.get(7)?,
        duration: row.get(8)?,
        sort_order: row.get(9)?,
    })
}

pub fn load_class(conn: &Connection, class_id: &str) -> rusqlite::Result<Option<ClassRow>> {
    conn.query_row(
        "SELECT id, name, academic_year_id FROM classes WHERE id = ?",
        [class_id],
        |r| {
            Ok(ClassRow {
                id: r.get(0)?,
                name: r.get(1)?,
                academic_year_id: r.get(2)?,
            })
        },
    )
    .optional()
}

pub fn load_academic_year(conn: &Connection, year_id: &str) -> rusqlite::Result<Option<AcademicYearRow>> {
    conn.query_row(
        "SELECT id, name, start_date, end_date FROM academic_years WHERE id = ?",
        [year_id],
        |r| {
            Ok(AcademicYearRow {
                id: r.get(0)?,
                name: r.get(1)?,
                start_date: r.get(2)?,
                end_date: r.get(3)?,
            })
        },
    )
    .optional()
}

pub fn load_timetable_config(
    conn: &Connection,
    year_id: &str,
) -> rusqlite::Result<Option<TimetableConfigRow>> {
    conn.query_row(
        "SELECT academic_year_id, periods_per_day, week_zero FROM timetable_configs WHERE academic_year_id = ?",
        [year_id],
        |r| {
            Ok(TimetableConfigRow {
                academic_year_id: r.get(0)?,
                periods_per_day: r.get(1)?,
                week_zero: r.get(2)?,
            })
        },
    )
    .optional()
}

/// Slots of one class ordered by (day, period start).
pub fn load_slots(conn: &Connection, class_id: &str) -> rusqlite::Result<Vec<SlotSpec>> {
    let mut stmt = conn.prepare(
        "SELECT id, day, period_start, period_end, week
         FROM timetable_slots
         WHERE class_id = ?
         ORDER BY day, period_start, id",
    )?;
    let rows = stmt.query_map([class_id], |r| {
        Ok(SlotSpec {
            id: r.get(0)?,
            day: r.get(1)?,
            period_start: r.get(2)?,
            period_end: r.get(3)?,
            week: week_from_row(r, 4)?,
        })
    })?;
    rows.collect()
}

pub fn load_module(conn: &Connection, module_id: &str) -> rusqlite::Result<Option<ModuleRow>> {
    conn.query_row(
        "SELECT id, title FROM modules WHERE id = ?",
        [module_id],
        |r| {
            Ok(ModuleRow {
                id: r.get(0)?,
                title: r.get(1)?,
            })
        },
    )
    .optional()
}

/// Lesson templates of a module in template order.
pub fn load_module_lessons(conn: &Connection, module_id: &str) -> rusqlite::Result<Vec<LessonRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, module_id, title, content, duration, sort_order
         FROM lessons
         WHERE module_id = ?
         ORDER BY sort_order, id",
    )?;
    let rows = stmt.query_map([module_id], |r| {
        Ok(LessonRow {
            id: r.get(0)?,
            module_id: r.get(1)?,
            title: r.get(2)?,
            content: r.get(3)?,
            duration: r.get(4)?,
            sort_order: r.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn load_event(conn: &Connection, event_id: &str) -> rusqlite::Result<Option<CalendarEventRow>> {
    conn.query_row(
        "SELECT id, event_type, title, start_date, end_date, affects_all_classes
         FROM calendar_events
         WHERE id = ?",
        [event_id],
        event_from_row,
    )
    .optional()
}

/// Events overlapping `[from, to]`; open bounds are unbounded.
pub fn list_events(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> rusqlite::Result<Vec<CalendarEventRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, event_type, title, start_date, end_date, affects_all_classes
         FROM calendar_events
         WHERE (?1 IS NULL OR end_date >= ?1)
           AND (?2 IS NULL OR start_date <= ?2)
         ORDER BY start_date, end_date, id",
    )?;
    let rows = stmt.query_map(params![from, to], event_from_row)?;
    rows.collect()
}

pub fn load_blackouts(conn: &Connection) -> rusqlite::Result<Vec<Blackout>> {
    Ok(list_events(conn, None, None)?
        .iter()
        .map(CalendarEventRow::blackout)
        .collect())
}

pub fn load_scheduled_lesson(
    conn: &Connection,
    scheduled_id: &str,
) -> rusqlite::Result<Option<ScheduledLessonRow>> {
    let sql = format!("{} WHERE sl.id = ?", SCHEDULED_SELECT);
    conn.query_row(&sql, [scheduled_id], scheduled_from_row)
        .optional()
}

/// A class's scheduled lessons inside `[from, to]`, ordered by date then sequence.
pub fn list_class_lessons(
    conn: &Connection,
    class_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> rusqlite::Result<Vec<ScheduledLessonRow>> {
    let sql = format!(
        "{} WHERE ma.class_id = ?1
           AND (?2 IS NULL OR sl.calendar_date >= ?2)
           AND (?3 IS NULL OR sl.calendar_date <= ?3)
         ORDER BY sl.calendar_date, sl.sort_order, sl.id",
        SCHEDULED_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![class_id, from, to], scheduled_from_row)?;
    rows.collect()
}

/// Scheduled lessons of every class dated inside `[start, end]`.
pub fn list_lessons_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> rusqlite::Result<Vec<ScheduledLessonRow>> {
    let sql = format!(
        "{} WHERE sl.calendar_date >= ?1 AND sl.calendar_date <= ?2
         ORDER BY ma.class_id, sl.calendar_date, sl.sort_order, sl.id",
        SCHEDULED_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![start, end], scheduled_from_row)?;
    rows.collect()
}

pub fn insert_assignment(
    conn: &Connection,
    assignment_id: &str,
    class_id: &str,
    module_id: &str,
    start_date: NaiveDate,
    created_at: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO module_assignments(id, class_id, module_id, start_date, created_at)
         VALUES(?, ?, ?, ?, ?)",
        params![assignment_id, class_id, module_id, start_date, created_at],
    )?;
    Ok(())
}

pub fn insert_scheduled_lesson(
    conn: &Connection,
    scheduled_id: &str,
    assignment_id: &str,
    lesson: &LessonRow,
    calendar_date: NaiveDate,
    slot_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO scheduled_lessons(
            id, assignment_id, lesson_id, calendar_date, timetable_slot_id, title, content, duration, sort_order
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            scheduled_id,
            assignment_id,
            lesson.id,
            calendar_date,
            slot_id,
            lesson.title,
            lesson.content,
            lesson.duration,
            lesson.sort_order
        ],
    )?;
    Ok(())
}

pub fn update_scheduled_lesson_slot(
    conn: &Connection,
    scheduled_id: &str,
    calendar_date: NaiveDate,
    slot_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE scheduled_lessons SET calendar_date = ?, timetable_slot_id = ? WHERE id = ?",
        params![calendar_date, slot_id, scheduled_id],
    )?;
    Ok(())
}
