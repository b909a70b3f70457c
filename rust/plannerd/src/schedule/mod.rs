//! Storage-backed scheduling operations built on the pure engine.

mod assign;
mod cascade;
pub mod context;
mod error;
mod push;
mod reschedule;
pub mod store;

pub use assign::{assign_module_to_class, find_next_available_slot, unassign_module};
pub use error::ScheduleError;
pub use push::{push_lesson, PushDirection};
pub use reschedule::reschedule_lessons_for_event;
