//! Volunteer event authoring use-cases.
//!
//! # Invariants
//! - `category` is always a canonical catalog label.
//! - Every event has at least one service; service names are non-blank and
//!   unique within the event ignoring case.

use crate::config::Catalog;
use crate::identifier::write_with_unique_slug;
use crate::model::volunteer::{
    VolunteerEvent, VolunteerEventDraft, VolunteerEventId, VolunteerEventPatch, VolunteerService,
};
use crate::repo::event_repo::VolunteerEventRepository;
use crate::service::{require_title, AuthoringError};
use log::info;
use std::collections::HashSet;

const EVENTS_TABLE: &str = "volunteer_events";

pub struct VolunteerEventService<R: VolunteerEventRepository> {
    repo: R,
    catalog: Catalog,
}

impl<R: VolunteerEventRepository> VolunteerEventService<R> {
    pub fn new(repo: R, catalog: Catalog) -> Self {
        Self { repo, catalog }
    }

    pub fn create_event(
        &self,
        draft: &VolunteerEventDraft,
    ) -> Result<VolunteerEvent, AuthoringError> {
        require_title(&draft.title)?;
        let category = self.resolve_category(&draft.category)?;
        let services = normalize_services(&draft.services)?;

        let (_, event) =
            write_with_unique_slug(&self.repo, EVENTS_TABLE, &draft.title, None, |slug| {
                let mut event =
                    VolunteerEvent::from_draft(draft, slug.to_string(), category.clone());
                event.services = services.clone();
                self.repo.create_event(&event).map(|()| event)
            })?;
        info!(
            "event=volunteer_event_create module=service status=ok event_id={} slug={} services={}",
            event.id,
            event.slug,
            event.services.len()
        );
        Ok(event)
    }

    /// Applies `patch`; `services`, when present, replaces the whole list.
    pub fn update_event(
        &self,
        id: VolunteerEventId,
        patch: &VolunteerEventPatch,
    ) -> Result<VolunteerEvent, AuthoringError> {
        let mut event = self.require_event(id)?;
        if let Some(title) = &patch.title {
            require_title(title)?;
        }
        let renamed = patch
            .title
            .as_deref()
            .is_some_and(|title| title.trim() != event.title);

        patch.apply_to(&mut event);
        if let Some(category) = &patch.category {
            event.category = self.resolve_category(category)?;
        }
        if patch.services.is_some() {
            event.services = normalize_services(&event.services)?;
        }

        if renamed {
            let title = event.title.clone();
            write_with_unique_slug(&self.repo, EVENTS_TABLE, &title, Some(id), |slug| {
                event.slug = slug.to_string();
                self.repo.update_event(&event)
            })?;
        } else {
            self.repo.update_event(&event)?;
        }
        self.require_event(id)
    }

    pub fn deactivate_event(&self, id: VolunteerEventId) -> Result<(), AuthoringError> {
        let mut event = self.require_event(id)?;
        if !event.is_active {
            return Ok(());
        }
        event.is_active = false;
        self.repo.update_event(&event)?;
        Ok(())
    }

    /// Deletes the event with its services and registrations.
    pub fn delete_event(&self, id: VolunteerEventId) -> Result<(), AuthoringError> {
        self.repo.delete_event(id)?;
        info!("event=volunteer_event_delete module=service status=ok event_id={id}");
        Ok(())
    }

    pub fn get_event(&self, id: VolunteerEventId) -> Result<Option<VolunteerEvent>, AuthoringError> {
        Ok(self.repo.get_event(id)?)
    }

    fn require_event(&self, id: VolunteerEventId) -> Result<VolunteerEvent, AuthoringError> {
        self.repo.get_event(id)?.ok_or(AuthoringError::NotFound {
            entity: "volunteer event",
            id,
        })
    }

    fn resolve_category(&self, input: &str) -> Result<String, AuthoringError> {
        self.catalog
            .resolve_category(input)
            .map(str::to_string)
            .ok_or_else(|| {
                AuthoringError::invalid("category", format!("unknown category `{}`", input.trim()))
            })
    }
}

fn normalize_services(services: &[VolunteerService]) -> Result<Vec<VolunteerService>, AuthoringError> {
    if services.is_empty() {
        return Err(AuthoringError::invalid("services", "at least one service is required"));
    }
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(services.len());
    for service in services {
        let name = service.name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(AuthoringError::invalid("services", "service name must not be blank"));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(AuthoringError::invalid(
                "services",
                format!("duplicate service `{name}`"),
            ));
        }
        if service.max_volunteers == Some(0) {
            return Err(AuthoringError::invalid(
                "services",
                format!("service `{name}` must allow at least one volunteer"),
            ));
        }
        normalized.push(VolunteerService {
            name,
            max_volunteers: service.max_volunteers,
        });
    }
    Ok(normalized)
}
