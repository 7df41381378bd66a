//! Course repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist course resources for the staff authoring path.
//! - Answer slug probes for the identifier allocator.
//!
//! # Invariants
//! - `courses.slug` is backed by a unique index; a racing duplicate surfaces
//!   as `RepoError::UniqueViolation` on `courses(slug)`.
//! - Courses referenced by enrollments cannot be hard-deleted.

use crate::identifier::SlugStore;
use crate::model::course::{Course, CourseId};
use crate::repo::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const COURSE_SELECT_SQL: &str = "SELECT
    id,
    slug,
    title,
    description,
    department,
    capacity,
    member_quota,
    cost_cents,
    start_date,
    is_active,
    created_at,
    updated_at
FROM courses";

/// Repository interface for course authoring.
pub trait CourseRepository: SlugStore {
    fn create_course(&self, course: &Course) -> RepoResult<()>;
    /// Replaces every mutable column of an existing course.
    fn update_course(&self, course: &Course) -> RepoResult<()>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    fn get_course_by_slug(&self, slug: &str) -> RepoResult<Option<Course>>;
    fn set_course_active(&self, id: CourseId, is_active: bool) -> RepoResult<()>;
    fn count_enrollments(&self, id: CourseId) -> RepoResult<u32>;
    fn delete_course(&self, id: CourseId) -> RepoResult<()>;
}

/// SQLite-backed course repository.
pub struct SqliteCourseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCourseRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SlugStore for SqliteCourseRepository<'_> {
    fn slug_exists(&self, slug: &str, exclude_id: Option<uuid::Uuid>) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM courses
                WHERE slug = ?1
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![slug, exclude_id.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl CourseRepository for SqliteCourseRepository<'_> {
    fn create_course(&self, course: &Course) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO courses (
                id,
                slug,
                title,
                description,
                department,
                capacity,
                member_quota,
                cost_cents,
                start_date,
                is_active,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                course.id.to_string(),
                course.slug,
                course.title,
                course.description,
                course.department,
                course.capacity,
                bool_to_int(course.member_quota),
                course.cost_cents,
                course.start_date,
                bool_to_int(course.is_active),
                course.created_at,
                course.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_course(&self, course: &Course) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE courses
             SET
                slug = ?2,
                title = ?3,
                description = ?4,
                department = ?5,
                capacity = ?6,
                member_quota = ?7,
                cost_cents = ?8,
                start_date = ?9,
                is_active = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                course.id.to_string(),
                course.slug,
                course.title,
                course.description,
                course.department,
                course.capacity,
                bool_to_int(course.member_quota),
                course.cost_cents,
                course.start_date,
                bool_to_int(course.is_active),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "course",
                id: course.id,
            });
        }
        Ok(())
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        load_course(self.conn, id)
    }

    fn get_course_by_slug(&self, slug: &str) -> RepoResult<Option<Course>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COURSE_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_course_row(row)?)),
            None => Ok(None),
        }
    }

    fn set_course_active(&self, id: CourseId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE courses
             SET is_active = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(is_active)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "course", id });
        }
        Ok(())
    }

    fn count_enrollments(&self, id: CourseId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM course_enrollments WHERE course_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_course(&self, id: CourseId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM courses WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "course", id });
        }
        Ok(())
    }
}

/// Loads one course by id on any connection or open transaction.
pub(crate) fn load_course(conn: &Connection, id: CourseId) -> RepoResult<Option<Course>> {
    let mut stmt = conn.prepare(&format!("{COURSE_SELECT_SQL} WHERE id = ?1;"))?;
    let row = stmt
        .query_row([id.to_string()], |row| Ok(parse_course_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let id_text: String = row.get("id")?;
    Ok(Course {
        id: parse_uuid(&id_text, "courses.id")?,
        slug: row.get("slug")?,
        title: row.get("title")?,
        description: row.get("description")?,
        department: row.get("department")?,
        capacity: row.get("capacity")?,
        member_quota: parse_bool(row.get("member_quota")?, "courses.member_quota")?,
        cost_cents: row.get("cost_cents")?,
        start_date: row.get("start_date")?,
        is_active: parse_bool(row.get("is_active")?, "courses.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
