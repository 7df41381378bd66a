//! Announcement model (time-ordered content).
//!
//! # Invariants
//! - After an announcement dated `D` is activated, no other active
//!   announcement is dated strictly before `D`.
//! - Several active announcements dated on or after the newest activation
//!   are allowed, including equal dates.

use super::now_epoch_ms;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable announcement identifier.
pub type AnnouncementId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub body: String,
    /// Opaque reference to an uploaded image.
    pub image_ref: Option<String>,
    pub effective_date: NaiveDate,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Announcement {
    pub fn from_draft(draft: &AnnouncementDraft) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            body: draft.body.trim().to_string(),
            image_ref: draft.image_ref.clone(),
            effective_date: draft.effective_date,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Staff input for creating an announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementDraft {
    pub title: String,
    pub body: String,
    pub image_ref: Option<String>,
    pub effective_date: NaiveDate,
    pub is_active: bool,
}

/// Partial update for an announcement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_ref: Option<Option<String>>,
    pub effective_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

impl AnnouncementPatch {
    pub fn apply_to(&self, announcement: &mut Announcement) {
        if let Some(title) = &self.title {
            announcement.title = title.trim().to_string();
        }
        if let Some(body) = &self.body {
            announcement.body = body.trim().to_string();
        }
        if let Some(image_ref) = &self.image_ref {
            announcement.image_ref = image_ref.clone();
        }
        if let Some(effective_date) = self.effective_date {
            announcement.effective_date = effective_date;
        }
        if let Some(is_active) = self.is_active {
            announcement.is_active = is_active;
        }
    }
}
