//! Pure scheduling engine: week parity, blackout expansion, slot occupancy and
//! the sequential placer. Nothing in here touches storage.

pub mod blackout;
pub mod occupancy;
pub mod parity;
pub mod placer;

pub use blackout::{Blackout, BlackoutIndex, BlackoutKind};
pub use occupancy::OccupancyTracker;
pub use parity::{ParityAnchor, WeekCycle, WeekLabel, WeekNumberCache};
pub use placer::{
    place, search_window, Direction, PlacementFailure, PlacementItem, PlacementRequest, SlotSpec,
    CASCADE_DAY_BUDGET, FIRST_ASSIGNMENT_DAY_BUDGET,
};
