//! timetable-schema: record kinds and domain helpers for the
//! timetable admin backend.
//!
//! Builds on `timetable-db` for all storage access.

pub mod catalog;
pub mod records;
pub mod setup;

pub use catalog::Catalog;
pub use records::{Course, Group, LessonType, Room, Schedule, Subject, Teacher, TeacherInfo};
