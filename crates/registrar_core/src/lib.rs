//! Registration admission and state-consistency engine.
//! This crate is the single source of truth for capacity, uniqueness,
//! exclusivity and identifier invariants.

pub mod admission;
pub mod config;
pub mod db;
pub mod identifier;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod verification;

pub use admission::controller::{AdmissionController, CourseAdmission, VolunteerAdmission};
pub use admission::eligibility::{Clock, FixedClock, SystemClock};
pub use admission::{AdmissionError, AdmissionRejection};
pub use config::{load_config, Catalog, ConfigError, RegistrarConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use identifier::{allocate_slug, normalize_slug, SlugError, SlugStore};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogLevel,
    LoggingError,
};
pub use repo::announcement_repo::{AnnouncementRepository, SqliteAnnouncementRepository};
pub use repo::course_repo::{CourseRepository, SqliteCourseRepository};
pub use repo::event_repo::{SqliteVolunteerEventRepository, VolunteerEventRepository};
pub use repo::registration_repo::{RegistrationStore, SqliteRegistrationStore};
pub use repo::{RepoError, RepoResult};
pub use service::announcement_service::{AnnouncementService, AnnouncementWrite};
pub use service::course_service::{CourseRemoval, CourseService};
pub use service::event_service::VolunteerEventService;
pub use service::registration_service::{
    CourseEnrollmentRequest, RegistrationError, RegistrationService, VolunteerRegistrationRequest,
};
pub use service::AuthoringError;
pub use verification::{
    GatewayError, HttpVerificationGateway, VerificationFailure, VerificationGateway,
    VerificationOutcome,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
