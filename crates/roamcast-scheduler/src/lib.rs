//! # Roamcast Scheduler
//!
//! The single source of truth for "is it time to post now".
//!
//! The decision functions are pure over `Schedule` values; the `Scheduler`
//! struct wraps them with storage access. Polling is read-only — only a
//! confirmed publish advances state, so an external timer can ask as often
//! as it likes.

pub mod clock;
pub mod engine;

pub use clock::{format_in_offset, next_occurrence, parse_offset, parse_post_time};
pub use engine::{advance, due, Scheduler, SchedulePreview};
