use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

use super::cascade::{self, LessonChange};
use super::context::{load_blackout_window, load_class_plan, require_class};
use super::error::{Result, ScheduleError};
use super::store::{self, ScheduledLessonRow};
use crate::engine::{Direction, CASCADE_DAY_BUDGET};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleOutcome {
    pub lessons_rescheduled: usize,
    pub rescheduled_lesson_ids: Vec<String>,
    pub changes: Vec<LessonChange>,
    pub preview: bool,
}

/// Moves every lesson a calendar event displaces, plus every later lesson of
/// the same class, to the first free slots after the event ends.
///
/// Classes are planned independently; all resulting updates are written in a
/// single transaction.
pub fn reschedule_lessons_for_event(
    conn: &Connection,
    event_id: &str,
    preview: bool,
) -> Result<RescheduleOutcome> {
    let event = store::load_event(conn, event_id)?.ok_or(ScheduleError::NotFound("Event not found"))?;
    let range = event.blackout();

    let affected = store::list_lessons_in_range(conn, range.start, range.end)?;
    if affected.is_empty() {
        return Ok(RescheduleOutcome {
            preview,
            ..RescheduleOutcome::default()
        });
    }

    let search_start = range
        .end
        .succ_opt()
        .ok_or_else(|| ScheduleError::Validation(format!("cannot move past {}", range.end)))?;
    let blackouts =
        load_blackout_window(conn, search_start, Direction::Forward, CASCADE_DAY_BUDGET)?;

    let mut by_class: BTreeMap<String, Vec<ScheduledLessonRow>> = BTreeMap::new();
    for lesson in affected {
        by_class.entry(lesson.class_id.clone()).or_default().push(lesson);
    }

    let mut changes: Vec<LessonChange> = Vec::new();
    for (class_id, direct) in by_class {
        let class = require_class(conn, &class_id)?;
        let plan = load_class_plan(conn, class)?;
        let Some(latest) = direct.iter().map(|l| l.calendar_date).max() else {
            continue;
        };

        let all = store::list_class_lessons(conn, &class_id, None, None)?;
        let mut moving = direct;
        moving.extend(all.iter().filter(|l| l.calendar_date > latest).cloned());

        let baseline = cascade::baseline_excluding(&all, &moving);
        let class_changes = cascade::replan(
            &plan,
            &moving,
            baseline,
            Direction::Forward,
            search_start,
            &blackouts,
        )?;
        log::debug!(
            "event {}: class {} has {} lesson(s) to move",
            event.id,
            class_id,
            class_changes.len()
        );
        changes.extend(class_changes);
    }

    if !preview {
        cascade::persist(conn, &changes)?;
        log::info!(
            "rescheduled {} lesson(s) around {} event \"{}\" ({} to {})",
            changes.len(),
            event.kind.as_str(),
            event.title,
            range.start,
            range.end
        );
    }

    Ok(RescheduleOutcome {
        lessons_rescheduled: changes.len(),
        rescheduled_lesson_ids: changes.iter().map(|c| c.lesson_id.clone()).collect(),
        changes,
        preview,
    })
}
