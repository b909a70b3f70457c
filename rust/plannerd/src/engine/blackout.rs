use chrono::NaiveDate;
use std::collections::HashSet;

/// Calendar event kinds. Only kept for display and the school week count;
/// every kind blocks scheduling the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlackoutKind {
    Holiday,
    Closure,
    Absence,
}

impl BlackoutKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "holiday" => Some(Self::Holiday),
            "closure" => Some(Self::Closure),
            "absence" => Some(Self::Absence),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Holiday => "holiday",
            Self::Closure => "closure",
            Self::Absence => "absence",
        }
    }
}

/// An inclusive range of fully blocked calendar days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blackout {
    pub kind: BlackoutKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Blackout {
    pub fn new(kind: BlackoutKind, start: NaiveDate, end: NaiveDate) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        Self { kind, start, end }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    /// The part of this range inside `[from, to]`, if any.
    pub fn clipped(&self, from: NaiveDate, to: NaiveDate) -> Option<Blackout> {
        let start = self.start.max(from);
        let end = self.end.min(to);
        (start <= end).then_some(Blackout {
            kind: self.kind,
            start,
            end,
        })
    }
}

/// Per-day set of blocked dates expanded from blackout ranges.
#[derive(Debug, Clone, Default)]
pub struct BlackoutIndex {
    days: HashSet<NaiveDate>,
}

impl BlackoutIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blackouts<'a, I>(blackouts: I) -> Self
    where
        I: IntoIterator<Item = &'a Blackout>,
    {
        let mut index = Self::new();
        for b in blackouts {
            index.insert(b);
        }
        index
    }

    /// Expands only the days of each range that fall inside `[from, to]`, so
    /// the index size is bounded by the search window rather than by event
    /// length.
    pub fn from_blackouts_within<'a, I>(blackouts: I, from: NaiveDate, to: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Blackout>,
    {
        let clipped: Vec<Blackout> = blackouts
            .into_iter()
            .filter_map(|b| b.clipped(from, to))
            .collect();
        Self::from_blackouts(&clipped)
    }

    pub fn insert(&mut self, blackout: &Blackout) {
        self.days.extend(blackout.days());
    }

    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.days.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }
}
