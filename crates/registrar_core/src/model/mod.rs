//! Domain model for courses, volunteer events, registrations and announcements.
//!
//! # Responsibility
//! - Define the records the admission engine reasons about.
//! - Keep partial-update shapes explicit (`*Patch` structs) instead of ad hoc
//!   field-by-field SQL construction.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Timestamps are Unix epoch milliseconds.

pub mod announcement;
pub mod applicant;
pub mod course;
pub mod enrollment;
pub mod volunteer;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
