//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate verification, validation, admission and repository calls
//!   into caller-facing operations.
//! - Map layered failures to stable codes and status classes.

use crate::identifier::SlugError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod announcement_service;
pub mod course_service;
pub mod event_service;
pub mod registration_service;

/// Failure on the staff authoring path (courses, events, announcements).
#[derive(Debug)]
pub enum AuthoringError {
    InvalidField {
        field: &'static str,
        reason: String,
    },
    NotFound {
        entity: &'static str,
        id: Uuid,
    },
    Slug(SlugError),
    Repo(RepoError),
}

impl AuthoringError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidField { .. } => "invalid_field",
            Self::NotFound { .. } => "not_found",
            Self::Slug(SlugError::EmptyLabel) => "invalid_field",
            Self::Slug(SlugError::Exhausted { .. }) => "slug_exhausted",
            Self::Slug(SlugError::Repo(_)) | Self::Repo(_) => "store_failure",
        }
    }

    pub fn status_class(&self) -> u16 {
        match self {
            Self::InvalidField { .. } | Self::Slug(SlugError::EmptyLabel) => 400,
            Self::NotFound { .. } => 404,
            Self::Slug(_) | Self::Repo(_) => 500,
        }
    }
}

impl Display for AuthoringError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidField { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Slug(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthoringError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Slug(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthoringError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

impl From<SlugError> for AuthoringError {
    fn from(value: SlugError) -> Self {
        match value {
            SlugError::Repo(err) => Self::from(err),
            other => Self::Slug(other),
        }
    }
}

pub(crate) fn require_title(title: &str) -> Result<(), AuthoringError> {
    if title.trim().is_empty() {
        return Err(AuthoringError::invalid("title", "must not be blank"));
    }
    Ok(())
}
