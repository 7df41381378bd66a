//! Registration store used by the admission controller.
//!
//! # Responsibility
//! - Expose snapshot reads (resource, per-partition counts, identity
//!   existence) and registration writes.
//! - Provide `serialized`, the scope inside which an admission's reads and
//!   its write form one atomic check-and-insert.
//!
//! # Invariants
//! - `serialized` runs inside `BEGIN IMMEDIATE`: the database write lock is
//!   held from the first read to commit, so two admissions for the same
//!   resource cannot both observe the same free seat.
//! - `(course_id, document_number)` and `(event_id, document_number)` are
//!   unique indexes; duplicates surface as `RepoError::UniqueViolation`.
//! - Identity profile upsert is idempotent.

use crate::admission::quota::PartitionCounts;
use crate::model::applicant::{Applicant, IdentityProfile};
use crate::model::course::{Course, CourseId};
use crate::model::enrollment::{
    CourseEnrollment, EnrollmentId, EnrollmentStatus, MemberClass,
};
use crate::model::volunteer::{VolunteerEvent, VolunteerEventId, VolunteerRegistration};
use crate::repo::course_repo::load_course;
use crate::repo::event_repo::load_event;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

/// Table holding course enrollments; used to attribute unique violations.
pub const COURSE_ENROLLMENTS_TABLE: &str = "course_enrollments";
/// Table holding volunteer registrations.
pub const VOLUNTEER_REGISTRATIONS_TABLE: &str = "volunteer_registrations";
/// Identity-key columns of the per-resource uniqueness constraints.
pub const COURSE_IDENTITY_COLUMNS: &[&str] = &["course_id", "document_number"];
pub const VOLUNTEER_IDENTITY_COLUMNS: &[&str] = &["event_id", "document_number"];

/// Store contract consumed by the admission controller and registration
/// service.
pub trait RegistrationStore {
    /// Runs `work` as one serialized, all-or-nothing unit.
    ///
    /// Commits when `work` returns `Ok`, rolls back otherwise.
    fn serialized<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    fn count_enrollments_by_partition(&self, id: CourseId) -> RepoResult<PartitionCounts>;
    fn enrollment_exists(&self, id: CourseId, document_number: &str) -> RepoResult<bool>;
    fn insert_enrollment(&self, enrollment: &CourseEnrollment) -> RepoResult<()>;
    fn get_enrollment(&self, id: EnrollmentId) -> RepoResult<Option<CourseEnrollment>>;
    fn set_enrollment_status(&self, id: EnrollmentId, status: EnrollmentStatus) -> RepoResult<()>;

    fn get_volunteer_event(&self, id: VolunteerEventId) -> RepoResult<Option<VolunteerEvent>>;
    /// All registrations of the event, whatever service they were filed under.
    fn count_volunteer_registrations(&self, id: VolunteerEventId) -> RepoResult<u32>;
    /// Registration counts keyed by current canonical service name.
    fn count_registrations_by_service(
        &self,
        id: VolunteerEventId,
    ) -> RepoResult<BTreeMap<String, u32>>;
    fn volunteer_registration_exists(
        &self,
        id: VolunteerEventId,
        document_number: &str,
    ) -> RepoResult<bool>;
    fn insert_volunteer_registration(&self, registration: &VolunteerRegistration)
        -> RepoResult<()>;

    fn upsert_identity_profile(&self, profile: &IdentityProfile) -> RepoResult<()>;
    fn get_identity_profile(&self, document_number: &str) -> RepoResult<Option<IdentityProfile>>;
}

/// SQLite-backed registration store.
///
/// Cheap to copy; holds only a connection reference.
#[derive(Clone, Copy)]
pub struct SqliteRegistrationStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistrationStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RegistrationStore for SqliteRegistrationStore<'_> {
    fn serialized<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = work(self)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        load_course(self.conn, id)
    }

    fn count_enrollments_by_partition(&self, id: CourseId) -> RepoResult<PartitionCounts> {
        let mut stmt = self.conn.prepare(
            "SELECT member_class, COUNT(*) AS total
             FROM course_enrollments
             WHERE course_id = ?1
             GROUP BY member_class;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut counts = PartitionCounts::default();
        while let Some(row) = rows.next()? {
            let class: Option<String> = row.get("member_class")?;
            let total: u32 = row.get("total")?;
            match class.as_deref() {
                None => counts.unclassified += total,
                Some(value) => {
                    let class = MemberClass::parse(value).ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "invalid member class `{value}` in course_enrollments.member_class"
                        ))
                    })?;
                    counts.add(class, total);
                }
            }
        }
        Ok(counts)
    }

    fn enrollment_exists(&self, id: CourseId, document_number: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM course_enrollments
                WHERE course_id = ?1
                  AND document_number = ?2
            );",
            params![id.to_string(), document_number],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_enrollment(&self, enrollment: &CourseEnrollment) -> RepoResult<()> {
        let applicant = &enrollment.applicant;
        self.conn.execute(
            "INSERT INTO course_enrollments (
                id,
                course_id,
                document_number,
                full_name,
                email,
                phone,
                birth_date,
                member_class,
                payment_proof,
                status,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                enrollment.id.to_string(),
                enrollment.course_id.to_string(),
                applicant.document_number,
                applicant.full_name,
                applicant.email,
                applicant.phone,
                applicant.birth_date,
                enrollment.member_class.map(MemberClass::as_str),
                enrollment.payment_proof,
                enrollment.status.as_str(),
                enrollment.created_at,
                enrollment.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_enrollment(&self, id: EnrollmentId) -> RepoResult<Option<CourseEnrollment>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                course_id,
                document_number,
                full_name,
                email,
                phone,
                birth_date,
                member_class,
                payment_proof,
                status,
                created_at,
                updated_at
             FROM course_enrollments
             WHERE id = ?1;",
        )?;
        stmt.query_row([id.to_string()], |row| Ok(parse_enrollment_row(row)))
            .optional()?
            .transpose()
    }

    fn set_enrollment_status(&self, id: EnrollmentId, status: EnrollmentStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE course_enrollments
             SET status = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "course enrollment",
                id,
            });
        }
        Ok(())
    }

    fn get_volunteer_event(&self, id: VolunteerEventId) -> RepoResult<Option<VolunteerEvent>> {
        load_event(self.conn, id)
    }

    fn count_volunteer_registrations(&self, id: VolunteerEventId) -> RepoResult<u32> {
        let total = self.conn.query_row(
            "SELECT COUNT(*) FROM volunteer_registrations WHERE event_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn count_registrations_by_service(
        &self,
        id: VolunteerEventId,
    ) -> RepoResult<BTreeMap<String, u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.name AS service_name, COUNT(r.id) AS total
             FROM volunteer_services s
             LEFT JOIN volunteer_registrations r
               ON r.event_id = s.event_id
              AND r.service_name = s.name
             WHERE s.event_id = ?1
             GROUP BY s.name;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next()? {
            counts.insert(row.get("service_name")?, row.get("total")?);
        }
        Ok(counts)
    }

    fn volunteer_registration_exists(
        &self,
        id: VolunteerEventId,
        document_number: &str,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM volunteer_registrations
                WHERE event_id = ?1
                  AND document_number = ?2
            );",
            params![id.to_string(), document_number],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_volunteer_registration(
        &self,
        registration: &VolunteerRegistration,
    ) -> RepoResult<()> {
        let applicant = &registration.applicant;
        self.conn.execute(
            "INSERT INTO volunteer_registrations (
                id,
                event_id,
                document_number,
                full_name,
                email,
                phone,
                birth_date,
                service_name,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                registration.id.to_string(),
                registration.event_id.to_string(),
                applicant.document_number,
                applicant.full_name,
                applicant.email,
                applicant.phone,
                applicant.birth_date,
                registration.service_name,
                registration.created_at,
            ],
        )?;
        Ok(())
    }

    fn upsert_identity_profile(&self, profile: &IdentityProfile) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO identity_profiles (
                document_number,
                full_name,
                email,
                phone,
                birth_date,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (document_number) DO UPDATE SET
                full_name = excluded.full_name,
                email = excluded.email,
                phone = excluded.phone,
                birth_date = excluded.birth_date,
                updated_at = excluded.updated_at;",
            params![
                profile.document_number,
                profile.full_name,
                profile.email,
                profile.phone,
                profile.birth_date,
                profile.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_identity_profile(&self, document_number: &str) -> RepoResult<Option<IdentityProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT document_number, full_name, email, phone, birth_date, updated_at
                 FROM identity_profiles
                 WHERE document_number = ?1;",
                [document_number],
                |row| {
                    Ok(IdentityProfile {
                        document_number: row.get("document_number")?,
                        full_name: row.get("full_name")?,
                        email: row.get("email")?,
                        phone: row.get("phone")?,
                        birth_date: row.get("birth_date")?,
                        updated_at: row.get("updated_at")?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }
}

fn parse_enrollment_row(row: &Row<'_>) -> RepoResult<CourseEnrollment> {
    let id_text: String = row.get("id")?;
    let course_id_text: String = row.get("course_id")?;

    let member_class = match row.get::<_, Option<String>>("member_class")? {
        Some(value) => Some(MemberClass::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid member class `{value}` in course_enrollments.member_class"
            ))
        })?),
        None => None,
    };

    let status_text: String = row.get("status")?;
    let status = EnrollmentStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in course_enrollments.status"
        ))
    })?;

    Ok(CourseEnrollment {
        id: parse_uuid(&id_text, "course_enrollments.id")?,
        course_id: parse_uuid(&course_id_text, "course_enrollments.course_id")?,
        applicant: Applicant {
            document_number: row.get("document_number")?,
            full_name: row.get("full_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            birth_date: row.get("birth_date")?,
        },
        member_class,
        payment_proof: row.get("payment_proof")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
