pub mod academic;
pub mod calendar;
pub mod classes;
pub mod core;
pub mod modules;
pub mod schedule;
pub mod setup;
pub mod timetable;
