//! Capacity-partitioned admission controller.
//!
//! # Responsibility
//! - Turn one admission request into `Admitted` (row written) or a
//!   rejection, for courses and volunteer events.
//!
//! # Invariants
//! - Every read the decision depends on and the insert itself run inside
//!   one `RegistrationStore::serialized` scope.
//! - Proof is checked before any count is read.
//! - A write-time identity unique violation is `DuplicateRegistration`.

use crate::admission::quota::{evaluate_course_capacity, evaluate_service_capacity};
use crate::admission::{AdmissionError, AdmissionRejection};
use crate::model::applicant::Applicant;
use crate::model::course::CourseId;
use crate::model::enrollment::{CourseEnrollment, MemberClass};
use crate::model::volunteer::{VolunteerEventId, VolunteerRegistration};
use crate::repo::registration_repo::RegistrationStore;
use log::{error, info};

/// Course admission request. `applicant` must already be normalized.
#[derive(Debug, Clone)]
pub struct CourseAdmission {
    pub course_id: CourseId,
    pub applicant: Applicant,
    pub member_class: Option<MemberClass>,
    pub payment_proof: Option<String>,
}

/// Volunteer admission request. `applicant` must already be normalized.
#[derive(Debug, Clone)]
pub struct VolunteerAdmission {
    pub event_id: VolunteerEventId,
    pub applicant: Applicant,
    pub service_name: String,
}

/// Decides and records admissions against a registration store.
pub struct AdmissionController<S: RegistrationStore> {
    store: S,
}

impl<S: RegistrationStore> AdmissionController<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Admits one course enrollment in `pending` state.
    pub fn try_admit_course(
        &self,
        request: CourseAdmission,
    ) -> Result<CourseEnrollment, AdmissionError> {
        let course_id = request.course_id;
        let result = self.store.serialized(|store| -> Result<_, AdmissionError> {
            let course = store
                .get_course(course_id)?
                .ok_or(AdmissionRejection::ResourceNotFound(course_id))?;
            if !course.is_active {
                return Err(AdmissionRejection::ResourceInactive(course_id).into());
            }

            let has_proof = request
                .payment_proof
                .as_deref()
                .is_some_and(|proof| !proof.trim().is_empty());
            if course.requires_payment_proof() && !has_proof {
                return Err(AdmissionRejection::MissingProof.into());
            }

            if store.enrollment_exists(course_id, &request.applicant.document_number)? {
                return Err(AdmissionRejection::DuplicateRegistration.into());
            }

            let counts = store.count_enrollments_by_partition(course_id)?;
            evaluate_course_capacity(
                course.capacity,
                course.member_quota,
                &counts,
                request.member_class,
            )?;

            let member_class = if course.member_quota {
                request.member_class
            } else {
                None
            };
            let payment_proof = request
                .payment_proof
                .filter(|proof| !proof.trim().is_empty());
            let enrollment =
                CourseEnrollment::pending(course_id, request.applicant, member_class, payment_proof);
            store.insert_enrollment(&enrollment)?;
            Ok(enrollment)
        });

        log_outcome("course", course_id, result.as_ref().map(|_| ()));
        result
    }

    /// Admits one volunteer registration for a named service.
    pub fn try_admit_volunteer(
        &self,
        request: VolunteerAdmission,
    ) -> Result<VolunteerRegistration, AdmissionError> {
        let event_id = request.event_id;
        let result = self.store.serialized(|store| -> Result<_, AdmissionError> {
            let event = store
                .get_volunteer_event(event_id)?
                .ok_or(AdmissionRejection::ResourceNotFound(event_id))?;
            if !event.is_active {
                return Err(AdmissionRejection::ResourceInactive(event_id).into());
            }

            let service = event.find_service(&request.service_name).ok_or_else(|| {
                AdmissionRejection::UnknownService(request.service_name.trim().to_string())
            })?;

            if store.volunteer_registration_exists(event_id, &request.applicant.document_number)? {
                return Err(AdmissionRejection::DuplicateRegistration.into());
            }

            // Registrations filed under a since-renamed service still hold seats.
            let event_total = store.count_volunteer_registrations(event_id)?;
            let counts = store.count_registrations_by_service(event_id)?;
            let service_count = counts.get(&service.name).copied().unwrap_or(0);
            evaluate_service_capacity(
                event.capacity,
                event_total,
                service.max_volunteers,
                service_count,
            )?;

            let registration =
                VolunteerRegistration::new(event_id, request.applicant, service.name.clone());
            store.insert_volunteer_registration(&registration)?;
            Ok(registration)
        });

        log_outcome("volunteer", event_id, result.as_ref().map(|_| ()));
        result
    }
}

fn log_outcome(kind: &str, resource_id: uuid::Uuid, result: Result<(), &AdmissionError>) {
    match result {
        Ok(()) => info!(
            "event=admission module=admission status=ok kind={kind} resource_id={resource_id}"
        ),
        Err(AdmissionError::Rejected(rejection)) => info!(
            "event=admission module=admission status=rejected kind={kind} resource_id={resource_id} reason={}",
            rejection.code()
        ),
        Err(AdmissionError::Store(err)) => error!(
            "event=admission module=admission status=error kind={kind} resource_id={resource_id} error={err}"
        ),
    }
}
