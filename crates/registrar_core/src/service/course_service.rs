//! Course authoring use-cases.
//!
//! # Invariants
//! - `department` is always a canonical catalog label.
//! - The slug is allocated on create and re-allocated only when the title
//!   changes; the record's own slug never counts as a collision.
//! - A course with enrollments is never hard-deleted.

use crate::config::Catalog;
use crate::identifier::write_with_unique_slug;
use crate::model::course::{Course, CourseDraft, CourseId, CoursePatch};
use crate::repo::course_repo::CourseRepository;
use crate::service::{require_title, AuthoringError};
use log::info;

const COURSES_TABLE: &str = "courses";

/// What `remove_course` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseRemoval {
    Deleted,
    /// Enrollments exist, so the course was only closed.
    Deactivated,
}

/// Course service facade over repository implementations.
pub struct CourseService<R: CourseRepository> {
    repo: R,
    catalog: Catalog,
}

impl<R: CourseRepository> CourseService<R> {
    pub fn new(repo: R, catalog: Catalog) -> Self {
        Self { repo, catalog }
    }

    pub fn create_course(&self, draft: &CourseDraft) -> Result<Course, AuthoringError> {
        require_title(&draft.title)?;
        let department = self.resolve_department(&draft.department)?;

        let (_, course) =
            write_with_unique_slug(&self.repo, COURSES_TABLE, &draft.title, None, |slug| {
                let course = Course::from_draft(draft, slug.to_string(), department.clone());
                self.repo.create_course(&course).map(|()| course)
            })?;
        info!(
            "event=course_create module=service status=ok course_id={} slug={}",
            course.id, course.slug
        );
        Ok(course)
    }

    /// Applies `patch`; a changed title moves the slug.
    pub fn update_course(&self, id: CourseId, patch: &CoursePatch) -> Result<Course, AuthoringError> {
        let mut course = self.require_course(id)?;
        if patch.is_empty() {
            return Ok(course);
        }
        if let Some(title) = &patch.title {
            require_title(title)?;
        }
        let renamed = patch
            .title
            .as_deref()
            .is_some_and(|title| title.trim() != course.title);

        patch.apply_to(&mut course);
        if let Some(department) = &patch.department {
            course.department = self.resolve_department(department)?;
        }

        if renamed {
            let title = course.title.clone();
            write_with_unique_slug(&self.repo, COURSES_TABLE, &title, Some(id), |slug| {
                course.slug = slug.to_string();
                self.repo.update_course(&course)
            })?;
        } else {
            self.repo.update_course(&course)?;
        }
        self.require_course(id)
    }

    pub fn deactivate_course(&self, id: CourseId) -> Result<(), AuthoringError> {
        self.repo.set_course_active(id, false)?;
        Ok(())
    }

    /// Deletes a course without enrollments; otherwise deactivates it.
    pub fn remove_course(&self, id: CourseId) -> Result<CourseRemoval, AuthoringError> {
        self.require_course(id)?;
        let removal = if self.repo.count_enrollments(id)? == 0 {
            self.repo.delete_course(id)?;
            CourseRemoval::Deleted
        } else {
            self.repo.set_course_active(id, false)?;
            CourseRemoval::Deactivated
        };
        info!(
            "event=course_remove module=service status=ok course_id={id} outcome={}",
            match removal {
                CourseRemoval::Deleted => "deleted",
                CourseRemoval::Deactivated => "deactivated",
            }
        );
        Ok(removal)
    }

    pub fn get_course(&self, id: CourseId) -> Result<Option<Course>, AuthoringError> {
        Ok(self.repo.get_course(id)?)
    }

    pub fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>, AuthoringError> {
        Ok(self.repo.get_course_by_slug(slug)?)
    }

    fn require_course(&self, id: CourseId) -> Result<Course, AuthoringError> {
        self.repo
            .get_course(id)?
            .ok_or(AuthoringError::NotFound {
                entity: "course",
                id,
            })
    }

    fn resolve_department(&self, input: &str) -> Result<String, AuthoringError> {
        self.catalog
            .resolve_department(input)
            .map(str::to_string)
            .ok_or_else(|| {
                AuthoringError::invalid(
                    "department",
                    format!("unknown department `{}`", input.trim()),
                )
            })
    }
}
