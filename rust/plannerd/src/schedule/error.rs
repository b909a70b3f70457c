use chrono::NaiveDate;
use thiserror::Error;

use crate::engine::PlacementFailure;

/// Errors surfaced by the scheduling operations.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Could not schedule \"{title}\" ({lesson_id}): no free {duration}-period slot within {budget_days} days")]
    Unsatisfiable {
        lesson_id: String,
        title: String,
        duration: i64,
        budget_days: u32,
    },

    #[error("No free timetable slot within {budget_days} days of {from}")]
    NoOpenSlot { from: NaiveDate, budget_days: u32 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ScheduleError {
    pub fn unplaceable(failure: &PlacementFailure, title: &str) -> Self {
        Self::Unsatisfiable {
            lesson_id: failure.item_id.clone(),
            title: title.to_string(),
            duration: failure.duration,
            budget_days: failure.day_budget,
        }
    }

    /// Wire code used in IPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_failed",
            Self::Unsatisfiable { .. } | Self::NoOpenSlot { .. } => "unsatisfiable_placement",
            Self::Storage(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Unsatisfiable {
                lesson_id,
                title,
                duration,
                budget_days,
            } => Some(serde_json::json!({
                "lessonId": lesson_id,
                "title": title,
                "duration": duration,
                "budgetDays": budget_days,
            })),
            _ => None,
        }
    }
}

pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;
