use chrono::{Duration, NaiveDate};
use registrar_core::config::EligibilityConfig;
use registrar_core::db::open_db_in_memory;
use registrar_core::model::applicant::Applicant;
use registrar_core::model::course::{Course, CourseDraft};
use registrar_core::model::enrollment::{EnrollmentStatus, MemberClass};
use registrar_core::model::volunteer::{VolunteerEvent, VolunteerEventDraft, VolunteerService};
use registrar_core::{
    AdmissionRejection, CourseEnrollmentRequest, CourseRepository, FixedClock, GatewayError,
    RegistrationError, RegistrationService, RegistrationStore, SqliteCourseRepository,
    SqliteRegistrationStore, SqliteVolunteerEventRepository, VerificationFailure,
    VerificationGateway, VerificationOutcome, VolunteerEventRepository,
    VolunteerRegistrationRequest,
};
use rusqlite::Connection;
use std::cell::Cell;
use uuid::Uuid;

const TODAY: (i32, u32, u32) = (2024, 6, 15);

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(TODAY.0, TODAY.1, TODAY.2).unwrap()
}

#[derive(Clone, Copy)]
enum Verdict {
    Pass,
    Fail,
    Replayed,
    Timeout,
}

struct FakeGateway {
    verdict: Verdict,
    calls: Cell<u32>,
}

impl FakeGateway {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: Cell::new(0),
        }
    }
}

impl VerificationGateway for FakeGateway {
    fn verify(&self, _token: &str) -> Result<VerificationOutcome, GatewayError> {
        self.calls.set(self.calls.get() + 1);
        match self.verdict {
            Verdict::Pass => Ok(VerificationOutcome {
                success: true,
                ..VerificationOutcome::default()
            }),
            Verdict::Fail => Ok(VerificationOutcome::default()),
            Verdict::Replayed => Ok(VerificationOutcome {
                success: false,
                expired_or_replayed: true,
                error_codes: vec!["timeout-or-duplicate".to_string()],
            }),
            Verdict::Timeout => Err(GatewayError::Timeout),
        }
    }
}

type Service<'conn, 'g> =
    RegistrationService<SqliteRegistrationStore<'conn>, &'g FakeGateway, FixedClock>;

fn service<'conn, 'g>(conn: &'conn Connection, gateway: &'g FakeGateway) -> Service<'conn, 'g> {
    RegistrationService::new(
        SqliteRegistrationStore::new(conn),
        gateway,
        FixedClock(today()),
        EligibilityConfig::default(),
    )
}

fn seed_course(conn: &Connection, cost_cents: u32) -> Course {
    let draft = CourseDraft {
        title: "Formación Bíblica".to_string(),
        department: "Formación".to_string(),
        capacity: Some(10),
        member_quota: true,
        cost_cents,
        ..CourseDraft::default()
    };
    let course = Course::from_draft(&draft, format!("formacion-{}", Uuid::new_v4()), "Formación".to_string());
    SqliteCourseRepository::new(conn).create_course(&course).unwrap();
    course
}

fn seed_event(conn: &Connection) -> VolunteerEvent {
    let draft = VolunteerEventDraft {
        title: "Campaña de Invierno".to_string(),
        description: String::new(),
        category: "Logística".to_string(),
        event_date: NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
        capacity: None,
        services: vec![VolunteerService {
            name: "Bodega".to_string(),
            max_volunteers: Some(5),
        }],
    };
    let event = VolunteerEvent::from_draft(&draft, "campana-de-invierno".to_string(), "Logística".to_string());
    SqliteVolunteerEventRepository::new(conn)
        .create_event(&event)
        .unwrap();
    event
}

fn applicant(birth_date: NaiveDate) -> Applicant {
    Applicant {
        document_number: " 12.345.678-k ".to_string(),
        full_name: "  María   José  Rojas ".to_string(),
        email: " Maria.Rojas@Example.CL ".to_string(),
        phone: "+56 9 8765 4321".to_string(),
        birth_date,
    }
}

fn adult() -> NaiveDate {
    NaiveDate::from_ymd_opt(1988, 2, 29).unwrap()
}

fn course_request(course: &Course, birth_date: NaiveDate) -> CourseEnrollmentRequest {
    CourseEnrollmentRequest {
        course_id: course.id,
        applicant: applicant(birth_date),
        member_class: Some(MemberClass::Member),
        payment_proof: None,
        verification_token: "token-abc".to_string(),
    }
}

fn enrollment_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM course_enrollments;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn successful_enrollment_normalizes_identity_and_refreshes_profile() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let course = seed_course(&conn, 0);

    let enrollment = service
        .enroll_in_course(course_request(&course, adult()))
        .unwrap();
    assert_eq!(enrollment.applicant.document_number, "12345678-K");
    assert_eq!(enrollment.applicant.full_name, "María José Rojas");
    assert_eq!(enrollment.applicant.email, "maria.rojas@example.cl");
    assert_eq!(enrollment.status, EnrollmentStatus::Pending);

    let profile = service
        .get_identity_profile("12.345.678-k")
        .unwrap()
        .unwrap();
    assert_eq!(profile.full_name, "María José Rojas");
    assert_eq!(gateway.calls.get(), 1);
}

#[test]
fn profile_upsert_keeps_one_row_per_identity() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let first = seed_course(&conn, 0);
    let second = seed_course(&conn, 0);

    service
        .enroll_in_course(course_request(&first, adult()))
        .unwrap();
    let mut request = course_request(&second, adult());
    request.applicant.email = "nuevo@example.cl".to_string();
    service.enroll_in_course(request).unwrap();

    let profiles: i64 = conn
        .query_row("SELECT COUNT(*) FROM identity_profiles;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(profiles, 1);
    let profile = service.get_identity_profile("12345678-K").unwrap().unwrap();
    assert_eq!(profile.email, "nuevo@example.cl");
}

#[test]
fn verification_failures_are_distinct_and_write_nothing() {
    let conn = open_db_in_memory().unwrap();
    let course = seed_course(&conn, 0);

    for (verdict, expected) in [
        (Verdict::Fail, VerificationFailure::Rejected),
        (Verdict::Replayed, VerificationFailure::ExpiredOrReplayed),
        (Verdict::Timeout, VerificationFailure::Timeout),
    ] {
        let gateway = FakeGateway::new(verdict);
        let service = service(&conn, &gateway);
        let err = service
            .enroll_in_course(course_request(&course, adult()))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Verification(f) if f == expected));
        assert_eq!(err.status_class(), 403);
    }

    assert_eq!(enrollment_count(&conn), 0);
    let profiles: i64 = conn
        .query_row("SELECT COUNT(*) FROM identity_profiles;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(profiles, 0);
}

#[test]
fn missing_token_never_reaches_the_gateway() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let course = seed_course(&conn, 0);

    let mut request = course_request(&course, adult());
    request.verification_token = "  ".to_string();
    let err = service.enroll_in_course(request).unwrap_err();
    assert_eq!(err.code(), "verification_missing");
    assert_eq!(gateway.calls.get(), 0);
}

#[test]
fn one_day_short_of_eighteen_is_age_ineligible() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let course = seed_course(&conn, 0);

    let eighteenth_birthday = NaiveDate::from_ymd_opt(TODAY.0 - 18, TODAY.1, TODAY.2).unwrap();
    let too_young = eighteenth_birthday + Duration::days(1);
    let err = service
        .enroll_in_course(course_request(&course, too_young))
        .unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(&AdmissionRejection::AgeIneligible { minimum_age: 18 })
    );
    assert_eq!(err.status_class(), 400);
    assert_eq!(enrollment_count(&conn), 0);

    service
        .enroll_in_course(course_request(&course, eighteenth_birthday))
        .unwrap();
}

#[test]
fn invalid_applicant_fields_are_reported_by_field() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let course = seed_course(&conn, 0);

    let mut request = course_request(&course, adult());
    request.applicant.email = "not-an-email".to_string();
    let err = service.enroll_in_course(request).unwrap_err();
    assert!(matches!(
        err.rejection(),
        Some(AdmissionRejection::InvalidField { field: "email", .. })
    ));
    assert_eq!(err.code(), "invalid_field");
}

#[test]
fn document_number_variants_collide_as_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let course = seed_course(&conn, 0);

    service
        .enroll_in_course(course_request(&course, adult()))
        .unwrap();
    let mut again = course_request(&course, adult());
    again.applicant.document_number = "12345678-K".to_string();
    let err = service.enroll_in_course(again).unwrap_err();
    assert_eq!(err.code(), "duplicate_registration");
    assert_eq!(err.status_class(), 400);
}

#[test]
fn unknown_course_maps_to_not_found_class() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let mut course = seed_course(&conn, 0);
    course.id = Uuid::new_v4();

    let err = service
        .enroll_in_course(course_request(&course, adult()))
        .unwrap_err();
    assert_eq!(err.status_class(), 404);
    assert_eq!(err.code(), "resource_not_found");
}

#[test]
fn volunteers_use_their_own_minimum_age() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let event = seed_event(&conn);

    let sixteen = NaiveDate::from_ymd_opt(TODAY.0 - 16, TODAY.1, TODAY.2).unwrap();
    let registration = service
        .register_volunteer(VolunteerRegistrationRequest {
            event_id: event.id,
            applicant: applicant(sixteen),
            service_name: "bodega".to_string(),
            verification_token: "token-xyz".to_string(),
        })
        .unwrap();
    assert_eq!(registration.service_name, "Bodega");

    let mut younger = applicant(sixteen + Duration::days(1));
    younger.document_number = "99887766-5".to_string();
    let err = service
        .register_volunteer(VolunteerRegistrationRequest {
            event_id: event.id,
            applicant: younger,
            service_name: "Bodega".to_string(),
            verification_token: "token-xyz".to_string(),
        })
        .unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(&AdmissionRejection::AgeIneligible { minimum_age: 16 })
    );
}

#[test]
fn review_moves_to_terminal_states_and_refuses_pending() {
    let conn = open_db_in_memory().unwrap();
    let gateway = FakeGateway::new(Verdict::Pass);
    let service = service(&conn, &gateway);
    let course = seed_course(&conn, 0);
    let enrollment = service
        .enroll_in_course(course_request(&course, adult()))
        .unwrap();

    let confirmed = service
        .review_enrollment(enrollment.id, EnrollmentStatus::Confirmed)
        .unwrap();
    assert_eq!(confirmed.status, EnrollmentStatus::Confirmed);

    let again = service
        .review_enrollment(enrollment.id, EnrollmentStatus::Confirmed)
        .unwrap();
    assert_eq!(again.status, EnrollmentStatus::Confirmed);

    let rejected = service
        .review_enrollment(enrollment.id, EnrollmentStatus::Rejected)
        .unwrap();
    assert_eq!(rejected.status, EnrollmentStatus::Rejected);

    let err = service
        .review_enrollment(enrollment.id, EnrollmentStatus::Pending)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_status_transition");

    let stored = service
        .store()
        .get_enrollment(enrollment.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, EnrollmentStatus::Rejected);

    let missing = service
        .review_enrollment(Uuid::new_v4(), EnrollmentStatus::Confirmed)
        .unwrap_err();
    assert_eq!(missing.status_class(), 404);
}
