use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;

use super::context::ClassPlan;
use super::error::{Result, ScheduleError};
use super::store::{self, ScheduledLessonRow};
use crate::engine::{
    place, BlackoutIndex, Direction, OccupancyTracker, PlacementItem, PlacementRequest,
    CASCADE_DAY_BUDGET,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonChange {
    pub lesson_id: String,
    pub class_id: String,
    pub title: String,
    pub old_date: NaiveDate,
    pub new_date: NaiveDate,
    pub old_slot_id: String,
    pub new_slot_id: String,
}

/// Occupancy of every class lesson outside the reschedule set; those stay put.
pub fn baseline_excluding(
    all: &[ScheduledLessonRow],
    moving: &[ScheduledLessonRow],
) -> OccupancyTracker {
    let moving_ids: HashSet<&str> = moving.iter().map(|l| l.id.as_str()).collect();
    all.iter()
        .filter(|l| !moving_ids.contains(l.id.as_str()))
        .map(|l| (l.calendar_date, l.timetable_slot_id.as_str()))
        .collect()
}

/// Re-seats `moving` (in sequence order) and returns only the lessons whose
/// date or slot changed.
pub fn replan(
    plan: &ClassPlan,
    moving: &[ScheduledLessonRow],
    mut occupancy: OccupancyTracker,
    direction: Direction,
    start: NaiveDate,
    blackouts: &BlackoutIndex,
) -> Result<Vec<LessonChange>> {
    if moving.is_empty() {
        return Ok(Vec::new());
    }
    let items: Vec<PlacementItem> = moving
        .iter()
        .map(|l| PlacementItem {
            id: l.id.clone(),
            duration: l.duration,
        })
        .collect();
    let request = PlacementRequest {
        items: &items,
        slots: &plan.slots,
        direction,
        start,
        parity_reference: plan.anchor.reference(start),
        week_cycle: plan.week_cycle,
        blackouts,
        day_budget: CASCADE_DAY_BUDGET,
    };
    let placements = place(&request, &mut occupancy)
        .map_err(|f| ScheduleError::unplaceable(&f, &moving[f.item_index].title))?;
    log::debug!(
        "class {}: re-seated {} lesson(s) {:?} from {}",
        plan.class.id,
        placements.len(),
        direction,
        start
    );

    Ok(moving
        .iter()
        .zip(placements)
        .filter(|(old, new)| old.calendar_date != new.date || old.timetable_slot_id != new.slot_id)
        .map(|(old, new)| LessonChange {
            lesson_id: old.id.clone(),
            class_id: old.class_id.clone(),
            title: old.title.clone(),
            old_date: old.calendar_date,
            new_date: new.date,
            old_slot_id: old.timetable_slot_id.clone(),
            new_slot_id: new.slot_id,
        })
        .collect())
}

/// Writes every change inside one transaction.
pub fn persist(conn: &Connection, changes: &[LessonChange]) -> Result<()> {
    if changes.is_empty() {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    for change in changes {
        store::update_scheduled_lesson_slot(&tx, &change.lesson_id, change.new_date, &change.new_slot_id)?;
    }
    tx.commit()?;
    Ok(())
}
