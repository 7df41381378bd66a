//! Admission decisions for capacity-partitioned resources.
//!
//! # Responsibility
//! - Decide whether a registration may be admitted (`controller`).
//! - Keep the decision rules pure and separately testable (`quota`,
//!   `eligibility`).
//!
//! # Invariants
//! - A rejection never leaves a partial write behind.
//! - Identity-key unique violations are reported as
//!   `DuplicateRegistration`, never as store failures.

use crate::repo::registration_repo::{
    COURSE_ENROLLMENTS_TABLE, COURSE_IDENTITY_COLUMNS, VOLUNTEER_IDENTITY_COLUMNS,
    VOLUNTEER_REGISTRATIONS_TABLE,
};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod controller;
pub mod eligibility;
pub mod quota;

/// Terminal, caller-visible reason an admission was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionRejection {
    ResourceNotFound(Uuid),
    ResourceInactive(Uuid),
    MissingProof,
    DuplicateRegistration,
    PartitionFull,
    CapacityFull,
    AgeIneligible { minimum_age: u32 },
    UnknownService(String),
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

impl AdmissionRejection {
    /// Stable snake_case code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResourceNotFound(_) => "resource_not_found",
            Self::ResourceInactive(_) => "resource_inactive",
            Self::MissingProof => "missing_proof",
            Self::DuplicateRegistration => "duplicate_registration",
            Self::PartitionFull => "partition_full",
            Self::CapacityFull => "capacity_full",
            Self::AgeIneligible { .. } => "age_ineligible",
            Self::UnknownService(_) => "unknown_service",
            Self::InvalidField { .. } => "invalid_field",
        }
    }

    /// HTTP-like status class for the caller.
    pub fn status_class(&self) -> u16 {
        match self {
            Self::ResourceNotFound(_) => 404,
            _ => 400,
        }
    }
}

impl Display for AdmissionRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceNotFound(id) => write!(f, "resource not found: {id}"),
            Self::ResourceInactive(id) => write!(f, "resource is not accepting registrations: {id}"),
            Self::MissingProof => write!(f, "payment proof is required"),
            Self::DuplicateRegistration => write!(f, "identity is already registered"),
            Self::PartitionFull => write!(f, "no seats left for this group"),
            Self::CapacityFull => write!(f, "no seats left"),
            Self::AgeIneligible { minimum_age } => {
                write!(f, "minimum age is {minimum_age}")
            }
            Self::UnknownService(name) => write!(f, "unknown service `{name}`"),
            Self::InvalidField { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl Error for AdmissionRejection {}

/// Admission failure: a terminal rejection or a store failure.
#[derive(Debug)]
pub enum AdmissionError {
    Rejected(AdmissionRejection),
    Store(RepoError),
}

impl AdmissionError {
    pub fn rejection(&self) -> Option<&AdmissionRejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Store(_) => None,
        }
    }
}

impl Display for AdmissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(rejection) => write!(f, "admission rejected: {rejection}"),
            Self::Store(err) => write!(f, "admission store failure: {err}"),
        }
    }
}

impl Error for AdmissionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<AdmissionRejection> for AdmissionError {
    fn from(value: AdmissionRejection) -> Self {
        Self::Rejected(value)
    }
}

impl From<RepoError> for AdmissionError {
    fn from(value: RepoError) -> Self {
        if value.is_unique_violation(COURSE_ENROLLMENTS_TABLE, COURSE_IDENTITY_COLUMNS)
            || value.is_unique_violation(VOLUNTEER_REGISTRATIONS_TABLE, VOLUNTEER_IDENTITY_COLUMNS)
        {
            return Self::Rejected(AdmissionRejection::DuplicateRegistration);
        }
        Self::Store(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{AdmissionError, AdmissionRejection};
    use crate::repo::RepoError;

    #[test]
    fn identity_unique_violation_becomes_duplicate_registration() {
        let err = AdmissionError::from(RepoError::UniqueViolation {
            table: "course_enrollments".to_string(),
            columns: vec!["course_id".to_string(), "document_number".to_string()],
        });
        assert_eq!(
            err.rejection(),
            Some(&AdmissionRejection::DuplicateRegistration)
        );
    }

    #[test]
    fn other_unique_violations_stay_store_failures() {
        let err = AdmissionError::from(RepoError::UniqueViolation {
            table: "course_enrollments".to_string(),
            columns: vec!["id".to_string()],
        });
        assert!(matches!(err, AdmissionError::Store(_)));
    }

    #[test]
    fn only_missing_resources_map_to_not_found_class() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(AdmissionRejection::ResourceNotFound(id).status_class(), 404);
        assert_eq!(AdmissionRejection::ResourceInactive(id).status_class(), 400);
        assert_eq!(AdmissionRejection::CapacityFull.status_class(), 400);
        assert_eq!(AdmissionRejection::CapacityFull.code(), "capacity_full");
    }
}
