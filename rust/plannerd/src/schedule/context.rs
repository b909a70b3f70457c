use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::{json, Map, Value as JsonValue};

use super::error::{Result, ScheduleError};
use super::store::{self, ClassRow};
use crate::db;
use crate::engine::parity::week_start;
use crate::engine::{search_window, BlackoutIndex, Direction, ParityAnchor, SlotSpec, WeekCycle};

pub const TIMETABLE_SETTINGS_KEY: &str = "setup.timetable";

/// Where A/B parity is counted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// The academic year's persisted week-zero date.
    Fixed,
    /// The start date of whichever operation is running.
    Operation,
}

impl AnchorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(Self::Fixed),
            "operation" => Some(Self::Operation),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Operation => "operation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimetableSettings {
    pub week_cycle: WeekCycle,
    pub anchor_mode: AnchorMode,
}

impl Default for TimetableSettings {
    fn default() -> Self {
        Self {
            week_cycle: WeekCycle::Weekly,
            anchor_mode: AnchorMode::Fixed,
        }
    }
}

impl TimetableSettings {
    pub fn from_json(obj: &Map<String, JsonValue>) -> Self {
        let defaults = Self::default();
        let week_cycle = obj
            .get("weeks")
            .and_then(|v| v.as_i64())
            .map(WeekCycle::from_weeks)
            .unwrap_or(defaults.week_cycle);
        let anchor_mode = obj
            .get("parityAnchor")
            .and_then(|v| v.as_str())
            .and_then(AnchorMode::parse)
            .unwrap_or(defaults.anchor_mode);
        Self {
            week_cycle,
            anchor_mode,
        }
    }

    pub fn to_json(self) -> JsonValue {
        json!({
            "weeks": self.week_cycle.weeks(),
            "parityAnchor": self.anchor_mode.as_str(),
        })
    }
}

/// Global timetable settings; unreadable or missing values fall back to defaults.
pub fn load_timetable_settings(conn: &Connection) -> TimetableSettings {
    match db::settings_get_json(conn, TIMETABLE_SETTINGS_KEY) {
        Ok(Some(JsonValue::Object(obj))) => TimetableSettings::from_json(&obj),
        Ok(_) => TimetableSettings::default(),
        Err(e) => {
            log::warn!("timetable settings unreadable, using defaults: {e:#}");
            TimetableSettings::default()
        }
    }
}

/// Configured cycle length in weeks, 1 or 2.
pub fn timetable_weeks(conn: &Connection) -> i64 {
    load_timetable_settings(conn).week_cycle.weeks()
}

/// Everything the placer needs to know about one class.
#[derive(Debug, Clone)]
pub struct ClassPlan {
    pub class: ClassRow,
    pub slots: Vec<SlotSpec>,
    pub week_cycle: WeekCycle,
    pub anchor: ParityAnchor,
}

pub fn require_class(conn: &Connection, class_id: &str) -> Result<ClassRow> {
    store::load_class(conn, class_id)?.ok_or(ScheduleError::NotFound("Class not found"))
}

pub fn resolve_anchor(
    conn: &Connection,
    class: &ClassRow,
    settings: TimetableSettings,
) -> Result<ParityAnchor> {
    if settings.anchor_mode == AnchorMode::Operation {
        return Ok(ParityAnchor::OperationStart);
    }
    let week_zero = match class.academic_year_id.as_deref() {
        Some(year_id) => store::load_timetable_config(conn, year_id)?.and_then(|c| c.week_zero),
        None => None,
    };
    match week_zero {
        Some(date) => Ok(ParityAnchor::Fixed(week_start(date).unwrap_or(date))),
        None => {
            if settings.week_cycle == WeekCycle::Biweekly {
                log::warn!(
                    "class {} has no week-zero anchor, counting A/B weeks from the operation start",
                    class.id
                );
            }
            Ok(ParityAnchor::OperationStart)
        }
    }
}

pub fn load_class_plan(conn: &Connection, class: ClassRow) -> Result<ClassPlan> {
    let settings = load_timetable_settings(conn);
    let anchor = resolve_anchor(conn, &class, settings)?;
    let slots = store::load_slots(conn, &class.id)?;
    Ok(ClassPlan {
        class,
        slots,
        week_cycle: settings.week_cycle,
        anchor,
    })
}

/// Blocked days a search from `start` can reach within `day_budget`.
pub fn load_blackout_window(
    conn: &Connection,
    start: NaiveDate,
    direction: Direction,
    day_budget: u32,
) -> Result<BlackoutIndex> {
    let (from, to) = search_window(start, direction, day_budget);
    // Filtered here rather than in SQL: dates are stored as text, which only
    // sorts correctly for four-digit years.
    let blackouts = store::load_blackouts(conn)?;
    Ok(BlackoutIndex::from_blackouts_within(&blackouts, from, to))
}
