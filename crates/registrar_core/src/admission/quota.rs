//! Capacity and partition quota arithmetic.
//!
//! Pure functions over counts already read from the store. The same rules
//! apply no matter which partition fills first.
//!
//! # Invariants
//! - `quota.member + quota.non_member == capacity`, with
//!   `quota.member == capacity / 2` (the remainder goes to non-members).
//! - The total ceiling is checked before partition math and is never
//!   exceeded, even through overflow.

use crate::admission::AdmissionRejection;
use crate::model::enrollment::MemberClass;

/// Per-partition seat allowance for a member-quota course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionQuota {
    pub member: u32,
    pub non_member: u32,
}

impl PartitionQuota {
    pub fn for_class(&self, class: MemberClass) -> u32 {
        match class {
            MemberClass::Member => self.member,
            MemberClass::NonMember => self.non_member,
        }
    }
}

/// Splits `capacity` evenly; an odd seat goes to non-members.
pub fn split_capacity(capacity: u32) -> PartitionQuota {
    let member = capacity / 2;
    PartitionQuota {
        member,
        non_member: capacity - member,
    }
}

/// Current enrollment counts per partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionCounts {
    pub member: u32,
    pub non_member: u32,
    /// Rows without a partition tag (e.g. admitted before quotas were on).
    pub unclassified: u32,
}

impl PartitionCounts {
    pub fn total(&self) -> u32 {
        self.member + self.non_member + self.unclassified
    }

    pub fn for_class(&self, class: MemberClass) -> u32 {
        match class {
            MemberClass::Member => self.member,
            MemberClass::NonMember => self.non_member,
        }
    }

    pub fn add(&mut self, class: MemberClass, count: u32) {
        match class {
            MemberClass::Member => self.member += count,
            MemberClass::NonMember => self.non_member += count,
        }
    }
}

/// Decides whether one more course enrollment fits.
///
/// - member quota on and no partition tag: `InvalidField`, at any capacity.
/// - `capacity = None`: otherwise always admitted.
/// - total at/above capacity: `CapacityFull`.
/// - member quota off: admitted under the ceiling.
/// - own partition below quota: admitted.
/// - own partition full: admitted only if the other partition still has
///   headroom (overflow), otherwise `PartitionFull`.
pub fn evaluate_course_capacity(
    capacity: Option<u32>,
    member_quota: bool,
    counts: &PartitionCounts,
    class: Option<MemberClass>,
) -> Result<(), AdmissionRejection> {
    let class = match (member_quota, class) {
        (false, _) => None,
        (true, Some(class)) => Some(class),
        (true, None) => {
            return Err(AdmissionRejection::InvalidField {
                field: "member_class",
                reason: "required for member-quota courses",
            })
        }
    };
    let Some(capacity) = capacity else {
        return Ok(());
    };
    if counts.total() >= capacity {
        return Err(AdmissionRejection::CapacityFull);
    }
    let Some(class) = class else {
        return Ok(());
    };

    let quota = split_capacity(capacity);
    if counts.for_class(class) < quota.for_class(class) {
        return Ok(());
    }

    let other = class.other();
    if counts.for_class(other) < quota.for_class(other) {
        Ok(())
    } else {
        Err(AdmissionRejection::PartitionFull)
    }
}

/// Decides whether one more volunteer fits in a service.
///
/// `event_total` is the registration count across all services of the
/// event; `event_capacity` is the optional event-wide ceiling.
pub fn evaluate_service_capacity(
    event_capacity: Option<u32>,
    event_total: u32,
    service_max: Option<u32>,
    service_count: u32,
) -> Result<(), AdmissionRejection> {
    if event_capacity.is_some_and(|capacity| event_total >= capacity) {
        return Err(AdmissionRejection::CapacityFull);
    }
    if service_max.is_some_and(|max| service_count >= max) {
        return Err(AdmissionRejection::PartitionFull);
    }
    Ok(())
}
