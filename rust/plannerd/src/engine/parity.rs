use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use std::collections::HashMap;

use super::blackout::{Blackout, BlackoutKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekLabel {
    A,
    B,
}

impl WeekLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(Self::A),
            "B" | "b" => Some(Self::B),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

/// How often the timetable repeats. `Biweekly` turns on A/B slot filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekCycle {
    Weekly,
    Biweekly,
}

impl WeekCycle {
    pub fn from_weeks(weeks: i64) -> Self {
        if weeks == 2 {
            Self::Biweekly
        } else {
            Self::Weekly
        }
    }

    pub fn weeks(self) -> i64 {
        match self {
            Self::Weekly => 1,
            Self::Biweekly => 2,
        }
    }
}

/// Which date A/B parity is counted from.
///
/// `Fixed` carries the persisted week-zero date of the academic year, so every
/// operation agrees on the label of a given day. `OperationStart` counts from
/// whatever date the running operation starts its search on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityAnchor {
    Fixed(NaiveDate),
    OperationStart,
}

impl ParityAnchor {
    pub fn reference(self, operation_start: NaiveDate) -> NaiveDate {
        match self {
            Self::Fixed(week_zero) => week_zero,
            Self::OperationStart => operation_start,
        }
    }
}

/// ISO weekday, 1 (Monday) through 7 (Sunday).
pub fn weekday(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// `A` when the 1-based week index of `date` relative to `reference` is odd.
///
/// Dates before the reference use floored division so the alternation stays
/// unbroken across it.
pub fn week_label(date: NaiveDate, reference: NaiveDate) -> WeekLabel {
    let days = (date - reference).num_days();
    let week = days.div_euclid(7) + 1;
    if week.rem_euclid(2) == 1 {
        WeekLabel::A
    } else {
        WeekLabel::B
    }
}

/// Monday of the week containing `date`, or `None` when that Monday falls
/// before the first representable date.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_signed(ChronoDuration::days(i64::from(weekday(date)) - 1))
}

/// September 1 of the calendar year the academic year starts in.
pub fn academic_year_origin(academic_year_start: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(academic_year_start.year(), 9, 1)
}

fn is_holiday_week(monday: NaiveDate, holidays: &[&Blackout]) -> bool {
    (0..5).all(|offset| {
        monday
            .checked_add_signed(ChronoDuration::days(offset))
            .is_some_and(|day| holidays.iter().any(|h| h.covers(day)))
    })
}

/// Display-only school week number.
///
/// Week 1 is the week containing September 1. Weeks whose five weekdays all
/// fall inside holiday events are not counted. Returns `None` before
/// September 1 and for dates inside a skipped week.
pub fn school_week_number(
    academic_year_start: NaiveDate,
    date: NaiveDate,
    events: &[Blackout],
) -> Option<u32> {
    let origin = academic_year_origin(academic_year_start)?;
    if date < origin {
        return None;
    }
    let holidays: Vec<&Blackout> = events
        .iter()
        .filter(|e| e.kind == BlackoutKind::Holiday)
        .collect();

    let target_week = week_start(date)?;
    let mut monday = week_start(origin)?;
    let mut count: u32 = 0;
    while monday <= target_week {
        let skipped = is_holiday_week(monday, &holidays);
        if monday == target_week {
            return if skipped { None } else { Some(count + 1) };
        }
        if !skipped {
            count += 1;
        }
        monday = monday.checked_add_signed(ChronoDuration::days(7))?;
    }
    None
}

/// Memoizes school week numbers per (academic year start, date).
///
/// Must be invalidated whenever calendar events change.
#[derive(Debug, Default)]
pub struct WeekNumberCache {
    entries: HashMap<(NaiveDate, NaiveDate), Option<u32>>,
}

impl WeekNumberCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_compute<E>(
        &mut self,
        academic_year_start: NaiveDate,
        date: NaiveDate,
        load_events: impl FnOnce() -> Result<Vec<Blackout>, E>,
    ) -> Result<Option<u32>, E> {
        let key = (academic_year_start, date);
        if let Some(hit) = self.entries.get(&key) {
            return Ok(*hit);
        }
        let events = load_events()?;
        let value = school_week_number(academic_year_start, date, &events);
        self.entries.insert(key, value);
        Ok(value)
    }

    pub fn invalidate(&mut self) {
        if !self.is_empty() {
            log::debug!("week number cache cleared ({} entries)", self.len());
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
