//! Applicant identity fields shared by every registration kind.
//!
//! # Responsibility
//! - Carry the person-level data submitted on the public registration path.
//! - Normalize and validate those fields before admission runs.
//!
//! # Invariants
//! - `document_number` is the identity key: trimmed, uppercase, no inner
//!   whitespace. Two submissions that differ only in spacing/case collide.
//! - `email` is trimmed and lowercased.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static DOCUMENT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9-]{4,20}$").expect("valid document regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+()\s-]{6,20}$").expect("valid phone regex"));

const FULL_NAME_MAX_CHARS: usize = 120;

/// Person-level fields submitted with a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    /// External identity key (national document number).
    pub document_number: String,
    pub full_name: String,
    pub email: String,
    /// May be empty.
    pub phone: String,
    pub birth_date: NaiveDate,
}

/// Field-level validation failures for applicant input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicantValidationError {
    InvalidDocumentNumber,
    MissingFullName,
    FullNameTooLong,
    InvalidEmail,
    InvalidPhone,
}

impl ApplicantValidationError {
    /// Name of the offending input field.
    pub fn field(self) -> &'static str {
        match self {
            Self::InvalidDocumentNumber => "document_number",
            Self::MissingFullName | Self::FullNameTooLong => "full_name",
            Self::InvalidEmail => "email",
            Self::InvalidPhone => "phone",
        }
    }

    /// Short machine-friendly reason.
    pub fn reason(self) -> &'static str {
        match self {
            Self::InvalidDocumentNumber => "must be 4-20 letters, digits or hyphens",
            Self::MissingFullName => "must not be blank",
            Self::FullNameTooLong => "must not exceed 120 characters",
            Self::InvalidEmail => "must be a valid email address",
            Self::InvalidPhone => "must be 6-20 digits, spaces or +()- characters",
        }
    }
}

impl Display for ApplicantValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field(), self.reason())
    }
}

impl Error for ApplicantValidationError {}

impl Applicant {
    /// Returns a normalized copy, or the first validation failure.
    ///
    /// Normalization happens before validation so that the identity key used
    /// for uniqueness is canonical.
    pub fn normalized(&self) -> Result<Self, ApplicantValidationError> {
        let candidate = Self {
            document_number: normalize_document_number(&self.document_number),
            full_name: self.full_name.split_whitespace().collect::<Vec<_>>().join(" "),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            birth_date: self.birth_date,
        };
        candidate.validate()?;
        Ok(candidate)
    }

    /// Validates already-normalized fields.
    pub fn validate(&self) -> Result<(), ApplicantValidationError> {
        if !DOCUMENT_NUMBER_RE.is_match(&self.document_number) {
            return Err(ApplicantValidationError::InvalidDocumentNumber);
        }
        if self.full_name.trim().is_empty() {
            return Err(ApplicantValidationError::MissingFullName);
        }
        if self.full_name.chars().count() > FULL_NAME_MAX_CHARS {
            return Err(ApplicantValidationError::FullNameTooLong);
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ApplicantValidationError::InvalidEmail);
        }
        if !self.phone.is_empty() && !PHONE_RE.is_match(&self.phone) {
            return Err(ApplicantValidationError::InvalidPhone);
        }
        Ok(())
    }
}

/// Canonical identity-key form: uppercase, whitespace and dots removed.
pub fn normalize_document_number(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '.')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Lightweight per-person profile refreshed after each admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub document_number: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub updated_at: i64,
}

impl IdentityProfile {
    /// Builds a profile snapshot from normalized applicant data.
    pub fn from_applicant(applicant: &Applicant, updated_at: i64) -> Self {
        Self {
            document_number: applicant.document_number.clone(),
            full_name: applicant.full_name.clone(),
            email: applicant.email.clone(),
            phone: applicant.phone.clone(),
            birth_date: applicant.birth_date,
            updated_at,
        }
    }
}
