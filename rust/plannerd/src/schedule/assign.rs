use chrono::{Duration as ChronoDuration, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use super::context::{load_blackout_window, load_class_plan, require_class, ClassPlan};
use super::error::{Result, ScheduleError};
use super::store;
use crate::engine::parity::weekday;
use crate::engine::placer::label_for;
use crate::engine::{
    place, Direction, OccupancyTracker, PlacementItem, PlacementRequest,
    FIRST_ASSIGNMENT_DAY_BUDGET,
};

const NO_SLOTS: &str = "Class has no timetable slots configured";
const NO_LESSONS: &str = "Module has no lessons to schedule";
const NO_TIMETABLE_CONFIG: &str = "Class academic year has no timetable configuration";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOutcome {
    pub assignment_id: String,
    pub start_date: NaiveDate,
    pub lessons_scheduled: usize,
}

fn class_occupancy_from(
    conn: &Connection,
    class_id: &str,
    from: NaiveDate,
) -> Result<OccupancyTracker> {
    Ok(store::list_class_lessons(conn, class_id, Some(from), None)?
        .iter()
        .map(|l| (l.calendar_date, l.timetable_slot_id.as_str()))
        .collect())
}

fn next_open_date(conn: &Connection, plan: &ClassPlan, from: NaiveDate) -> Result<NaiveDate> {
    let occupied = class_occupancy_from(conn, &plan.class.id, from)?;
    let reference = plan.anchor.reference(from);
    for offset in 0..i64::from(FIRST_ASSIGNMENT_DAY_BUDGET) {
        let Some(date) = from.checked_add_signed(ChronoDuration::days(offset)) else {
            break;
        };
        let day = weekday(date);
        let label = label_for(plan.week_cycle, date, reference);
        let open = plan
            .slots
            .iter()
            .any(|s| s.runs_on(day, label) && !occupied.is_occupied(date, &s.id));
        if open {
            return Ok(date);
        }
    }
    Err(ScheduleError::NoOpenSlot {
        from,
        budget_days: FIRST_ASSIGNMENT_DAY_BUDGET,
    })
}

/// Earliest date on or after `from` (default `today`) with a matching slot
/// the class has not used yet.
pub fn find_next_available_slot(
    conn: &Connection,
    class_id: &str,
    from: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate> {
    let class = require_class(conn, class_id)?;
    let plan = load_class_plan(conn, class)?;
    if plan.slots.is_empty() {
        return Err(ScheduleError::Validation(NO_SLOTS.to_string()));
    }
    next_open_date(conn, &plan, from.unwrap_or(today))
}

/// First-time placement of a module's lessons onto a class.
///
/// Nothing is written unless every lesson found a slot; the assignment and
/// its scheduled lessons are then inserted in one transaction.
pub fn assign_module_to_class(
    conn: &Connection,
    class_id: &str,
    module_id: &str,
    start_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<AssignOutcome> {
    let class = require_class(conn, class_id)?;
    let module =
        store::load_module(conn, module_id)?.ok_or(ScheduleError::NotFound("Module not found"))?;

    let has_config = match class.academic_year_id.as_deref() {
        Some(year_id) => store::load_timetable_config(conn, year_id)?.is_some(),
        None => false,
    };
    if !has_config {
        return Err(ScheduleError::Validation(NO_TIMETABLE_CONFIG.to_string()));
    }

    let plan = load_class_plan(conn, class)?;
    if plan.slots.is_empty() {
        return Err(ScheduleError::Validation(NO_SLOTS.to_string()));
    }
    let lessons = store::load_module_lessons(conn, &module.id)?;
    if lessons.is_empty() {
        return Err(ScheduleError::Validation(NO_LESSONS.to_string()));
    }

    let start = match start_date {
        Some(d) => d,
        None => next_open_date(conn, &plan, today)?,
    };

    let mut occupancy = class_occupancy_from(conn, &plan.class.id, start)?;
    let blackouts =
        load_blackout_window(conn, start, Direction::Forward, FIRST_ASSIGNMENT_DAY_BUDGET)?;
    let items: Vec<PlacementItem> = lessons
        .iter()
        .map(|l| PlacementItem {
            id: l.id.clone(),
            duration: l.duration,
        })
        .collect();
    let request = PlacementRequest {
        items: &items,
        slots: &plan.slots,
        direction: Direction::Forward,
        start,
        parity_reference: plan.anchor.reference(start),
        week_cycle: plan.week_cycle,
        blackouts: &blackouts,
        day_budget: FIRST_ASSIGNMENT_DAY_BUDGET,
    };
    log::debug!(
        "placing {} lesson(s) for class {}: {} seat(s) taken, {} blocked day(s)",
        items.len(),
        plan.class.id,
        occupancy.len(),
        blackouts.len()
    );
    let placements = place(&request, &mut occupancy)
        .map_err(|f| ScheduleError::unplaceable(&f, &lessons[f.item_index].title))?;
    for p in &placements {
        log::debug!("lesson {} -> {} slot {}", p.item_id, p.date, p.slot_id);
    }

    let assignment_id = Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    store::insert_assignment(&tx, &assignment_id, &plan.class.id, &module.id, start, &created_at)?;
    for (lesson, placement) in lessons.iter().zip(&placements) {
        store::insert_scheduled_lesson(
            &tx,
            &Uuid::new_v4().to_string(),
            &assignment_id,
            lesson,
            placement.date,
            &placement.slot_id,
        )?;
    }
    tx.commit()?;

    log::info!(
        "assigned module \"{}\" to class \"{}\" from {}: {} lesson(s), assignment {}",
        module.title,
        plan.class.name,
        start,
        placements.len(),
        assignment_id
    );
    Ok(AssignOutcome {
        assignment_id,
        start_date: start,
        lessons_scheduled: placements.len(),
    })
}

/// Deletes an assignment and its scheduled lessons together.
pub fn unassign_module(conn: &Connection, assignment_id: &str) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let exists = tx
        .query_row(
            "SELECT 1 FROM module_assignments WHERE id = ?",
            [assignment_id],
            |_r| Ok(()),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ScheduleError::NotFound("Assignment not found"));
    }
    let removed = tx.execute(
        "DELETE FROM scheduled_lessons WHERE assignment_id = ?",
        [assignment_id],
    )?;
    tx.execute("DELETE FROM module_assignments WHERE id = ?", [assignment_id])?;
    tx.commit()?;
    log::info!("removed assignment {} ({} scheduled lesson(s))", assignment_id, removed);
    Ok(removed)
}
