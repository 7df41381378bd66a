//! Volunteer event model.
//!
//! # Invariants
//! - Service names are unique within one event (case-insensitive).
//! - `max_volunteers = None` means the service is unlimited.
//! - Volunteer registrations have no review workflow.

use super::applicant::Applicant;
use super::now_epoch_ms;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable volunteer event identifier.
pub type VolunteerEventId = Uuid;

/// One selectable service (shift/role) of a volunteer event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerService {
    pub name: String,
    pub max_volunteers: Option<u32>,
}

/// Canonical volunteer event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerEvent {
    pub id: VolunteerEventId,
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Canonical category label from the injected catalog.
    pub category: String,
    pub event_date: NaiveDate,
    /// Optional ceiling across all services.
    pub capacity: Option<u32>,
    /// Ordered as authored.
    pub services: Vec<VolunteerService>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl VolunteerEvent {
    pub fn from_draft(draft: &VolunteerEventDraft, slug: String, category: String) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            slug,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            category,
            event_date: draft.event_date,
            capacity: draft.capacity,
            services: draft.services.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Finds a service by name, ignoring case and surrounding whitespace.
    pub fn find_service(&self, name: &str) -> Option<&VolunteerService> {
        let wanted = name.trim().to_lowercase();
        self.services
            .iter()
            .find(|service| service.name.to_lowercase() == wanted)
    }
}

/// Staff input for creating a volunteer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolunteerEventDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub event_date: NaiveDate,
    pub capacity: Option<u32>,
    pub services: Vec<VolunteerService>,
}

/// Partial update for a volunteer event. `services` replaces the full list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolunteerEventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub capacity: Option<Option<u32>>,
    pub services: Option<Vec<VolunteerService>>,
    pub is_active: Option<bool>,
}

impl VolunteerEventPatch {
    /// Merges present fields except `category`, which the caller resolves.
    pub fn apply_to(&self, event: &mut VolunteerEvent) {
        if let Some(title) = &self.title {
            event.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            event.description = description.trim().to_string();
        }
        if let Some(event_date) = self.event_date {
            event.event_date = event_date;
        }
        if let Some(capacity) = self.capacity {
            event.capacity = capacity;
        }
        if let Some(services) = &self.services {
            event.services = services.clone();
        }
        if let Some(is_active) = self.is_active {
            event.is_active = is_active;
        }
    }
}

/// Stable volunteer registration identifier.
pub type VolunteerRegistrationId = Uuid;

/// Persisted volunteer sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerRegistration {
    pub id: VolunteerRegistrationId,
    pub event_id: VolunteerEventId,
    pub applicant: Applicant,
    /// Canonical name of the selected service.
    pub service_name: String,
    pub created_at: i64,
}

impl VolunteerRegistration {
    pub fn new(event_id: VolunteerEventId, applicant: Applicant, service_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            applicant,
            service_name,
            created_at: now_epoch_ms(),
        }
    }
}
