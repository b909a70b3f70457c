use rusqlite::Connection;
use serde::Serialize;

use super::cascade::{self, LessonChange};
use super::context::{load_blackout_window, load_class_plan, require_class};
use super::error::{Result, ScheduleError};
use super::store::{self, ScheduledLessonRow};
use crate::engine::{Direction, CASCADE_DAY_BUDGET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDirection {
    Forward,
    Back,
}

impl PushDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "forward" => Some(Self::Forward),
            "back" | "backward" => Some(Self::Back),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub lessons_affected: usize,
    pub affected_lesson_ids: Vec<String>,
    pub changes: Vec<LessonChange>,
    pub preview: bool,
}

/// Moves one scheduled lesson a slot forward or back and cascades the shift
/// through every lesson of the class on that side of it.
///
/// Forward re-seats the target and every lesson dated on or after it, starting
/// the day after the target's date. Back re-seats the target and every lesson
/// dated on or before it, scanning backward from the day before. Every
/// calendar event blocks its days regardless of type.
pub fn push_lesson(
    conn: &Connection,
    scheduled_id: &str,
    direction: PushDirection,
    preview: bool,
) -> Result<PushOutcome> {
    let target = store::load_scheduled_lesson(conn, scheduled_id)?
        .ok_or(ScheduleError::NotFound("Lesson not found"))?;
    let class = require_class(conn, &target.class_id)?;
    let plan = load_class_plan(conn, class)?;

    let all = store::list_class_lessons(conn, &plan.class.id, None, None)?;
    let pivot = target.calendar_date;
    let (moving, search_start, engine_direction): (Vec<ScheduledLessonRow>, _, _) = match direction
    {
        PushDirection::Forward => (
            all.iter().filter(|l| l.calendar_date >= pivot).cloned().collect(),
            pivot.succ_opt(),
            Direction::Forward,
        ),
        PushDirection::Back => (
            all.iter().filter(|l| l.calendar_date <= pivot).cloned().collect(),
            pivot.pred_opt(),
            Direction::Backward,
        ),
    };
    let search_start = search_start
        .ok_or_else(|| ScheduleError::Validation(format!("cannot move past {}", pivot)))?;

    let blackouts = load_blackout_window(conn, search_start, engine_direction, CASCADE_DAY_BUDGET)?;
    let baseline = cascade::baseline_excluding(&all, &moving);
    let changes = cascade::replan(
        &plan,
        &moving,
        baseline,
        engine_direction,
        search_start,
        &blackouts,
    )?;

    if !preview {
        cascade::persist(conn, &changes)?;
        log::info!(
            "pushed lesson {} {:?}: {} lesson(s) moved in class {}",
            scheduled_id,
            direction,
            changes.len(),
            plan.class.id
        );
    }

    Ok(PushOutcome {
        lessons_affected: changes.len(),
        affected_lesson_ids: changes.iter().map(|c| c.lesson_id.clone()).collect(),
        changes,
        preview,
    })
}
