//! Greedy first-fit placement of an ordered item list onto recurring timetable slots.
//!
//! The search walks a cursor day by day (forward or backward) from a start
//! date. On each unblocked day it offers the current item every slot whose
//! weekday, A/B label and duration match, in a fixed tie-break order, and takes
//! the first one not already occupied. The cursor only moves when the current
//! item finds nothing on that day, so several items can share a day through
//! different slots.

use chrono::{Duration as ChronoDuration, NaiveDate};

use super::blackout::BlackoutIndex;
use super::occupancy::OccupancyTracker;
use super::parity::{week_label, weekday, WeekCycle, WeekLabel};

pub const FIRST_ASSIGNMENT_DAY_BUDGET: u32 = 365;
pub const CASCADE_DAY_BUDGET: u32 = 730;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub id: String,
    /// ISO weekday, 1 (Monday) through 7 (Sunday).
    pub day: u32,
    pub period_start: i64,
    pub period_end: i64,
    pub week: Option<WeekLabel>,
}

impl SlotSpec {
    pub fn duration(&self) -> i64 {
        self.period_end - self.period_start + 1
    }

    /// True when the slot recurs on `day` in a week labelled `label`.
    /// A `None` label (weekly cycle) or an unlabelled slot matches every week.
    pub fn runs_on(&self, day: u32, label: Option<WeekLabel>) -> bool {
        if self.day != day {
            return false;
        }
        match (self.week, label) {
            (Some(slot_week), Some(current)) => slot_week == current,
            _ => true,
        }
    }

    fn accepts(&self, day: u32, label: Option<WeekLabel>, duration: i64) -> bool {
        self.duration() == duration && self.runs_on(day, label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementItem {
    pub id: String,
    pub duration: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self) -> ChronoDuration {
        match self {
            Self::Forward => ChronoDuration::days(1),
            Self::Backward => ChronoDuration::days(-1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacementRequest<'a> {
    pub items: &'a [PlacementItem],
    pub slots: &'a [SlotSpec],
    pub direction: Direction,
    pub start: NaiveDate,
    /// Date A/B labels are counted from. Ignored for weekly cycles.
    pub parity_reference: NaiveDate,
    pub week_cycle: WeekCycle,
    pub blackouts: &'a BlackoutIndex,
    pub day_budget: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub item_id: String,
    pub date: NaiveDate,
    pub slot_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no free {duration}-period slot for item {item_id} within {day_budget} days")]
pub struct PlacementFailure {
    /// Index into the request's item list.
    pub item_index: usize,
    pub item_id: String,
    pub duration: i64,
    pub day_budget: u32,
}

/// Forward scans ascend by (day, period start); backward scans descend.
/// Slot id breaks remaining ties.
pub fn tie_break_order(slots: &[SlotSpec], direction: Direction) -> Vec<&SlotSpec> {
    let mut ordered: Vec<&SlotSpec> = slots.iter().collect();
    ordered.sort_by(|a, b| {
        let asc = a
            .day
            .cmp(&b.day)
            .then(a.period_start.cmp(&b.period_start))
            .then_with(|| a.id.cmp(&b.id));
        match direction {
            Direction::Forward => asc,
            Direction::Backward => asc.reverse(),
        }
    });
    ordered
}

/// Label used for slot matching on `date`; `None` when the cycle is weekly.
pub fn label_for(week_cycle: WeekCycle, date: NaiveDate, reference: NaiveDate) -> Option<WeekLabel> {
    match week_cycle {
        WeekCycle::Weekly => None,
        WeekCycle::Biweekly => Some(week_label(date, reference)),
    }
}

/// Inclusive range of days a search from `start` can visit within `day_budget`,
/// clamped to the representable calendar.
pub fn search_window(start: NaiveDate, direction: Direction, day_budget: u32) -> (NaiveDate, NaiveDate) {
    let reach = ChronoDuration::days(i64::from(day_budget));
    match direction {
        Direction::Forward => (
            start,
            start.checked_add_signed(reach).unwrap_or(NaiveDate::MAX),
        ),
        Direction::Backward => (
            start.checked_sub_signed(reach).unwrap_or(NaiveDate::MIN),
            start,
        ),
    }
}

fn days_from_start(request: &PlacementRequest<'_>, cursor: NaiveDate) -> i64 {
    (cursor - request.start).num_days().abs()
}

/// Seats every item or fails on the first one that cannot be seated inside
/// the day budget. Claimed pairs are recorded in `occupancy` as they are taken,
/// so on failure the tracker holds a partial result and should be discarded.
///
/// Results come back in input order regardless of direction.
pub fn place(
    request: &PlacementRequest<'_>,
    occupancy: &mut OccupancyTracker,
) -> Result<Vec<Placement>, PlacementFailure> {
    let slots = tie_break_order(request.slots, request.direction);
    let step = request.direction.step();
    let budget = i64::from(request.day_budget);

    let order: Vec<usize> = match request.direction {
        Direction::Forward => (0..request.items.len()).collect(),
        Direction::Backward => (0..request.items.len()).rev().collect(),
    };

    let mut placed: Vec<Option<Placement>> = vec![None; request.items.len()];
    let mut cursor = request.start;

    for idx in order {
        let item = &request.items[idx];
        let fail = || PlacementFailure {
            item_index: idx,
            item_id: item.id.clone(),
            duration: item.duration,
            day_budget: request.day_budget,
        };

        loop {
            if days_from_start(request, cursor) > budget {
                return Err(fail());
            }
            if !request.blackouts.is_blocked(cursor) {
                let day = weekday(cursor);
                let label = label_for(request.week_cycle, cursor, request.parity_reference);
                let hit = slots.iter().find(|slot| {
                    slot.accepts(day, label, item.duration)
                        && !occupancy.is_occupied(cursor, &slot.id)
                });
                if let Some(slot) = hit {
                    occupancy.occupy(cursor, &slot.id);
                    placed[idx] = Some(Placement {
                        item_id: item.id.clone(),
                        date: cursor,
                        slot_id: slot.id.clone(),
                    });
                    break;
                }
            }
            cursor = cursor.checked_add_signed(step).ok_or_else(fail)?;
        }
    }

    Ok(placed.into_iter().flatten().collect())
}
