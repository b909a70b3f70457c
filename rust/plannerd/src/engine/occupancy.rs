use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// `(date, slot id)` pairs already consumed by scheduled lessons.
#[derive(Debug, Clone, Default)]
pub struct OccupancyTracker {
    by_date: HashMap<NaiveDate, HashSet<String>>,
}

impl OccupancyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the pair was already taken.
    pub fn occupy(&mut self, date: NaiveDate, slot_id: &str) -> bool {
        self.by_date
            .entry(date)
            .or_default()
            .insert(slot_id.to_string())
    }

    pub fn is_occupied(&self, date: NaiveDate, slot_id: &str) -> bool {
        self.by_date
            .get(&date)
            .map(|slots| slots.contains(slot_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(|s| s.len()).sum()
    }
}

impl<S: AsRef<str>> FromIterator<(NaiveDate, S)> for OccupancyTracker {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, S)>>(iter: I) -> Self {
        let mut tracker = Self::new();
        for (date, slot_id) in iter {
            tracker.occupy(date, slot_id.as_ref());
        }
        tracker
    }
}
