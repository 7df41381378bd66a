//! Public registration use-cases.
//!
//! # Responsibility
//! - Run the inbound pipeline: verification, applicant normalization, age
//!   eligibility, admission, identity profile refresh.
//! - Apply staff review decisions to course enrollments.
//!
//! # Invariants
//! - Nothing is written unless verification and validation both pass.
//! - The identity profile upsert runs after the admission commit; its
//!   failure is logged and does not undo the admitted registration.

use crate::admission::controller::{AdmissionController, CourseAdmission, VolunteerAdmission};
use crate::admission::eligibility::{ensure_minimum_age, Clock};
use crate::admission::{AdmissionError, AdmissionRejection};
use crate::config::EligibilityConfig;
use crate::model::applicant::{Applicant, ApplicantValidationError, IdentityProfile};
use crate::model::course::CourseId;
use crate::model::enrollment::{
    CourseEnrollment, EnrollmentId, EnrollmentStatus, MemberClass, StatusTransitionError,
};
use crate::model::now_epoch_ms;
use crate::model::volunteer::{VolunteerEventId, VolunteerRegistration};
use crate::repo::registration_repo::RegistrationStore;
use crate::repo::RepoError;
use crate::verification::{require_verified, VerificationFailure, VerificationGateway};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Inbound course enrollment.
#[derive(Debug, Clone)]
pub struct CourseEnrollmentRequest {
    pub course_id: CourseId,
    pub applicant: Applicant,
    pub member_class: Option<MemberClass>,
    pub payment_proof: Option<String>,
    pub verification_token: String,
}

/// Inbound volunteer sign-up.
#[derive(Debug, Clone)]
pub struct VolunteerRegistrationRequest {
    pub event_id: VolunteerEventId,
    pub applicant: Applicant,
    pub service_name: String,
    pub verification_token: String,
}

/// Caller-facing registration failure.
#[derive(Debug)]
pub enum RegistrationError {
    Verification(VerificationFailure),
    Rejected(AdmissionRejection),
    EnrollmentNotFound(EnrollmentId),
    InvalidStatusTransition(StatusTransitionError),
    Store(RepoError),
}

impl RegistrationError {
    /// Stable snake_case code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Verification(failure) => failure.code(),
            Self::Rejected(rejection) => rejection.code(),
            Self::EnrollmentNotFound(_) => "enrollment_not_found",
            Self::InvalidStatusTransition(_) => "invalid_status_transition",
            Self::Store(_) => "store_failure",
        }
    }

    /// 400 validation/conflict, 403 verification, 404 unknown, 500 store.
    pub fn status_class(&self) -> u16 {
        match self {
            Self::Verification(_) => 403,
            Self::Rejected(rejection) => rejection.status_class(),
            Self::EnrollmentNotFound(_) => 404,
            Self::InvalidStatusTransition(_) => 400,
            Self::Store(_) => 500,
        }
    }

    pub fn rejection(&self) -> Option<&AdmissionRejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verification(failure) => write!(f, "{failure}"),
            Self::Rejected(rejection) => write!(f, "{rejection}"),
            Self::EnrollmentNotFound(id) => write!(f, "course enrollment not found: {id}"),
            Self::InvalidStatusTransition(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Verification(failure) => Some(failure),
            Self::Rejected(rejection) => Some(rejection),
            Self::InvalidStatusTransition(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::EnrollmentNotFound(_) => None,
        }
    }
}

impl From<VerificationFailure> for RegistrationError {
    fn from(value: VerificationFailure) -> Self {
        Self::Verification(value)
    }
}

impl From<AdmissionRejection> for RegistrationError {
    fn from(value: AdmissionRejection) -> Self {
        Self::Rejected(value)
    }
}

impl From<ApplicantValidationError> for RegistrationError {
    fn from(value: ApplicantValidationError) -> Self {
        Self::Rejected(AdmissionRejection::InvalidField {
            field: value.field(),
            reason: value.reason(),
        })
    }
}

impl From<AdmissionError> for RegistrationError {
    fn from(value: AdmissionError) -> Self {
        match value {
            AdmissionError::Rejected(rejection) => Self::Rejected(rejection),
            AdmissionError::Store(err) => Self::Store(err),
        }
    }
}

impl From<StatusTransitionError> for RegistrationError {
    fn from(value: StatusTransitionError) -> Self {
        Self::InvalidStatusTransition(value)
    }
}

impl From<RepoError> for RegistrationError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Registration service facade.
pub struct RegistrationService<S, G, C>
where
    S: RegistrationStore,
    G: VerificationGateway,
    C: Clock,
{
    controller: AdmissionController<S>,
    gateway: G,
    clock: C,
    eligibility: EligibilityConfig,
}

impl<S, G, C> RegistrationService<S, G, C>
where
    S: RegistrationStore,
    G: VerificationGateway,
    C: Clock,
{
    pub fn new(store: S, gateway: G, clock: C, eligibility: EligibilityConfig) -> Self {
        Self {
            controller: AdmissionController::new(store),
            gateway,
            clock,
            eligibility,
        }
    }

    pub fn store(&self) -> &S {
        self.controller.store()
    }

    /// Verifies, validates and admits one course enrollment.
    pub fn enroll_in_course(
        &self,
        request: CourseEnrollmentRequest,
    ) -> Result<CourseEnrollment, RegistrationError> {
        require_verified(&self.gateway, &request.verification_token)?;
        let applicant = request.applicant.normalized()?;
        ensure_minimum_age(
            applicant.birth_date,
            self.clock.today(),
            self.eligibility.course_min_age,
        )?;

        let enrollment = self.controller.try_admit_course(CourseAdmission {
            course_id: request.course_id,
            applicant,
            member_class: request.member_class,
            payment_proof: request.payment_proof,
        })?;
        self.refresh_profile(&enrollment.applicant);
        Ok(enrollment)
    }

    /// Verifies, validates and admits one volunteer registration.
    pub fn register_volunteer(
        &self,
        request: VolunteerRegistrationRequest,
    ) -> Result<VolunteerRegistration, RegistrationError> {
        require_verified(&self.gateway, &request.verification_token)?;
        let applicant = request.applicant.normalized()?;
        ensure_minimum_age(
            applicant.birth_date,
            self.clock.today(),
            self.eligibility.volunteer_min_age,
        )?;

        let registration = self.controller.try_admit_volunteer(VolunteerAdmission {
            event_id: request.event_id,
            applicant,
            service_name: request.service_name,
        })?;
        self.refresh_profile(&registration.applicant);
        Ok(registration)
    }

    /// Moves an enrollment to `confirmed` or `rejected`.
    ///
    /// Re-applying the current state is a no-op.
    pub fn review_enrollment(
        &self,
        id: EnrollmentId,
        next: EnrollmentStatus,
    ) -> Result<CourseEnrollment, RegistrationError> {
        let reviewed = self.store().serialized(|store| -> Result<_, RegistrationError> {
            let mut enrollment = store
                .get_enrollment(id)?
                .ok_or(RegistrationError::EnrollmentNotFound(id))?;
            let target = enrollment.status.transition_to(next)?;
            if target != enrollment.status {
                store.set_enrollment_status(id, target)?;
                enrollment.status = target;
            }
            Ok(enrollment)
        });

        match &reviewed {
            Ok(enrollment) => info!(
                "event=enrollment_review module=service status=ok enrollment_id={id} to={}",
                enrollment.status.as_str()
            ),
            Err(err) => warn!(
                "event=enrollment_review module=service status=rejected enrollment_id={id} reason={}",
                err.code()
            ),
        }
        reviewed
    }

    pub fn get_identity_profile(
        &self,
        document_number: &str,
    ) -> Result<Option<IdentityProfile>, RegistrationError> {
        let key = crate::model::applicant::normalize_document_number(document_number);
        Ok(self.store().get_identity_profile(&key)?)
    }

    fn refresh_profile(&self, applicant: &Applicant) {
        let profile = IdentityProfile::from_applicant(applicant, now_epoch_ms());
        if let Err(err) = self.store().upsert_identity_profile(&profile) {
            error!("event=profile_upsert module=service status=error error={err}");
        }
    }
}
