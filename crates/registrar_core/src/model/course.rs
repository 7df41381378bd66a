//! Course resource model.
//!
//! # Responsibility
//! - Describe a capacity-bounded course, optionally split into member and
//!   non-member partitions.
//! - Provide the draft/patch shapes used by the staff authoring path.
//!
//! # Invariants
//! - `capacity = None` means unlimited.
//! - `cost_cents > 0` means every enrollment must carry a payment proof.
//! - `slug` is unique among courses and only changes on an explicit rename.

use super::now_epoch_ms;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable course identifier.
pub type CourseId = Uuid;

/// Canonical course record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Canonical department label from the injected catalog.
    pub department: String,
    /// Total seats; `None` is unlimited.
    pub capacity: Option<u32>,
    /// When true, capacity is split evenly between members and non-members.
    pub member_quota: bool,
    pub cost_cents: u32,
    pub start_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Course {
    /// Builds a new active course from validated draft input.
    pub fn from_draft(draft: &CourseDraft, slug: String, department: String) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            slug,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            department,
            capacity: draft.capacity,
            member_quota: draft.member_quota,
            cost_cents: draft.cost_cents,
            start_date: draft.start_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether enrollments must carry a payment artifact.
    pub fn requires_payment_proof(&self) -> bool {
        self.cost_cents > 0
    }
}

/// Staff input for creating a course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub department: String,
    pub capacity: Option<u32>,
    pub member_quota: bool,
    pub cost_cents: u32,
    pub start_date: Option<NaiveDate>,
}

/// Partial update for a course. Only `Some` fields are applied.
///
/// Nullable columns use `Option<Option<_>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub capacity: Option<Option<u32>>,
    pub member_quota: Option<bool>,
    pub cost_cents: Option<u32>,
    pub start_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

impl CoursePatch {
    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merges present fields into `course`. Department and slug are resolved
    /// by the caller, which owns catalog and identifier rules.
    pub fn apply_to(&self, course: &mut Course) {
        if let Some(title) = &self.title {
            course.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            course.description = description.trim().to_string();
        }
        if let Some(capacity) = self.capacity {
            course.capacity = capacity;
        }
        if let Some(member_quota) = self.member_quota {
            course.member_quota = member_quota;
        }
        if let Some(cost_cents) = self.cost_cents {
            course.cost_cents = cost_cents;
        }
        if let Some(start_date) = self.start_date {
            course.start_date = start_date;
        }
        if let Some(is_active) = self.is_active {
            course.is_active = is_active;
        }
    }
}
