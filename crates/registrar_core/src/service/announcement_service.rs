//! Announcement use-cases.
//!
//! # Responsibility
//! - Validate staff input and route every path that can leave a record
//!   active through the repository's sweeping writes.
//!
//! # Invariants
//! - Creating active, updating to active and explicit activation all sweep
//!   older active announcements in the same transaction as the write.

use crate::model::announcement::{
    Announcement, AnnouncementDraft, AnnouncementId, AnnouncementPatch,
};
use crate::repo::announcement_repo::AnnouncementRepository;
use crate::service::{require_title, AuthoringError};
use log::info;

/// Result of a write that may have deactivated older announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementWrite {
    pub announcement: Announcement,
    /// Ids deactivated by the sweep.
    pub swept: Vec<AnnouncementId>,
}

pub struct AnnouncementService<R: AnnouncementRepository> {
    repo: R,
}

impl<R: AnnouncementRepository> AnnouncementService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_announcement(
        &self,
        draft: &AnnouncementDraft,
    ) -> Result<AnnouncementWrite, AuthoringError> {
        require_title(&draft.title)?;
        let announcement = Announcement::from_draft(draft);
        let swept = self.repo.insert_announcement(&announcement)?;
        log_write("announcement_create", announcement.id, &swept);
        Ok(AnnouncementWrite {
            announcement,
            swept,
        })
    }

    pub fn update_announcement(
        &self,
        id: AnnouncementId,
        patch: &AnnouncementPatch,
    ) -> Result<AnnouncementWrite, AuthoringError> {
        if let Some(title) = &patch.title {
            require_title(title)?;
        }
        let mut announcement = self.require_announcement(id)?;
        patch.apply_to(&mut announcement);
        let swept = self.repo.update_announcement(&announcement)?;
        log_write("announcement_update", id, &swept);
        Ok(AnnouncementWrite {
            announcement: self.require_announcement(id)?,
            swept,
        })
    }

    /// Activates at the record's own effective date.
    pub fn activate_announcement(
        &self,
        id: AnnouncementId,
    ) -> Result<AnnouncementWrite, AuthoringError> {
        let current = self.require_announcement(id)?;
        let swept = self.repo.activate(id, current.effective_date)?;
        log_write("announcement_activate", id, &swept);
        Ok(AnnouncementWrite {
            announcement: self.require_announcement(id)?,
            swept,
        })
    }

    pub fn deactivate_announcement(&self, id: AnnouncementId) -> Result<(), AuthoringError> {
        self.repo.deactivate(id)?;
        Ok(())
    }

    pub fn get_announcement(
        &self,
        id: AnnouncementId,
    ) -> Result<Option<Announcement>, AuthoringError> {
        Ok(self.repo.get_announcement(id)?)
    }

    /// Active announcements, newest effective date first.
    pub fn list_active_announcements(&self) -> Result<Vec<Announcement>, AuthoringError> {
        Ok(self.repo.list_announcements(true)?)
    }

    fn require_announcement(&self, id: AnnouncementId) -> Result<Announcement, AuthoringError> {
        self.repo
            .get_announcement(id)?
            .ok_or(AuthoringError::NotFound {
                entity: "announcement",
                id,
            })
    }
}

fn log_write(event: &str, id: AnnouncementId, swept: &[AnnouncementId]) {
    info!(
        "event={event} module=service status=ok announcement_id={id} swept={}",
        swept.len()
    );
}
