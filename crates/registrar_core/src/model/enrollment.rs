//! Course enrollment model and staff review state machine.
//!
//! # Invariants
//! - New enrollments start as `pending`.
//! - Staff may move any enrollment to `confirmed` or `rejected`; nothing moves
//!   back to `pending`. Re-applying the current terminal state is a no-op.
//! - At most one enrollment exists per `(course_id, document_number)`.

use super::applicant::Applicant;
use super::course::CourseId;
use super::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable enrollment identifier.
pub type EnrollmentId = Uuid;

/// Identity partition for member-quota courses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberClass {
    Member,
    NonMember,
}

impl MemberClass {
    /// Storage/wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::NonMember => "non_member",
        }
    }

    /// Parses the storage/wire string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(Self::Member),
            "non_member" => Some(Self::NonMember),
            _ => None,
        }
    }

    /// The partition sharing the same capacity pool.
    pub fn other(self) -> Self {
        match self {
            Self::Member => Self::NonMember,
            Self::NonMember => Self::Member,
        }
    }
}

/// Review status of a course enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Validates a staff-triggered transition and returns the target state.
    pub fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        match next {
            Self::Confirmed | Self::Rejected => Ok(next),
            Self::Pending => Err(StatusTransitionError {
                from: self,
                to: next,
            }),
        }
    }
}

/// Refused enrollment status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransitionError {
    pub from: EnrollmentStatus,
    pub to: EnrollmentStatus,
}

impl Display for StatusTransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "enrollment status cannot move from `{}` to `{}`",
            self.from.as_str(),
            self.to.as_str()
        )
    }
}

impl Error for StatusTransitionError {}

/// Persisted course enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub id: EnrollmentId,
    pub course_id: CourseId,
    pub applicant: Applicant,
    /// Partition tag; required for member-quota courses.
    pub member_class: Option<MemberClass>,
    /// Opaque reference to an uploaded payment artifact.
    pub payment_proof: Option<String>,
    pub status: EnrollmentStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CourseEnrollment {
    /// Builds a freshly admitted enrollment in `pending` state.
    pub fn pending(
        course_id: CourseId,
        applicant: Applicant,
        member_class: Option<MemberClass>,
        payment_proof: Option<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            course_id,
            applicant,
            member_class,
            payment_proof,
            status: EnrollmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
