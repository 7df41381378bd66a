use chrono::NaiveDate;
use registrar_core::db::open_db;
use registrar_core::model::applicant::Applicant;
use registrar_core::model::course::{Course, CourseDraft, CourseId};
use registrar_core::model::enrollment::MemberClass;
use registrar_core::{
    AdmissionController, AdmissionError, AdmissionRejection, CourseAdmission, CourseRepository,
    RegistrationStore, SqliteCourseRepository, SqliteRegistrationStore,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

fn applicant(document_number: String) -> Applicant {
    Applicant {
        document_number,
        full_name: "Concurrent Applicant".to_string(),
        email: "race@example.cl".to_string(),
        phone: String::new(),
        birth_date: NaiveDate::from_ymd_opt(1995, 3, 3).unwrap(),
    }
}

fn seed_course(path: &Path, capacity: Option<u32>, member_quota: bool) -> CourseId {
    let conn = open_db(path).unwrap();
    let draft = CourseDraft {
        title: "Retiro".to_string(),
        department: "Jóvenes".to_string(),
        capacity,
        member_quota,
        ..CourseDraft::default()
    };
    let course = Course::from_draft(&draft, "retiro".to_string(), "Jóvenes".to_string());
    SqliteCourseRepository::new(&conn)
        .create_course(&course)
        .unwrap();
    course.id
}

/// Runs one admission per thread, each on its own connection, all released
/// at the same instant.
fn race<F>(path: &Path, attempts: usize, make_request: F) -> Vec<Result<(), AdmissionRejection>>
where
    F: Fn(usize) -> CourseAdmission + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(attempts));
    let make_request = Arc::new(make_request);
    let handles: Vec<_> = (0..attempts)
        .map(|index| {
            let barrier = Arc::clone(&barrier);
            let make_request = Arc::clone(&make_request);
            let path: PathBuf = path.to_path_buf();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let controller = AdmissionController::new(SqliteRegistrationStore::new(&conn));
                let request = make_request(index);
                barrier.wait();
                match controller.try_admit_course(request) {
                    Ok(_) => Ok(()),
                    Err(AdmissionError::Rejected(rejection)) => Err(rejection),
                    Err(AdmissionError::Store(err)) => {
                        panic!("store failure under contention: {err}")
                    }
                }
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

#[test]
fn concurrent_admissions_never_exceed_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let course_id = seed_course(&path, Some(5), false);

    let outcomes = race(&path, 16, move |index| CourseAdmission {
        course_id,
        applicant: applicant(format!("RACE-{index:04}")),
        member_class: None,
        payment_proof: None,
    });

    let admitted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(admitted, 5);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|rejection| *rejection == AdmissionRejection::CapacityFull));

    let conn = open_db(&path).unwrap();
    let counts = SqliteRegistrationStore::new(&conn)
        .count_enrollments_by_partition(course_id)
        .unwrap();
    assert_eq!(counts.total(), 5);
}

#[test]
fn concurrent_partitioned_admissions_respect_the_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race-partitioned.db");
    let course_id = seed_course(&path, Some(7), true);

    let outcomes = race(&path, 20, move |index| CourseAdmission {
        course_id,
        applicant: applicant(format!("PART-{index:04}")),
        member_class: Some(if index % 3 == 0 {
            MemberClass::NonMember
        } else {
            MemberClass::Member
        }),
        payment_proof: None,
    });

    let admitted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(admitted, 7);

    let conn = open_db(&path).unwrap();
    let counts = SqliteRegistrationStore::new(&conn)
        .count_enrollments_by_partition(course_id)
        .unwrap();
    assert_eq!(counts.member + counts.non_member, 7);
}

#[test]
fn concurrent_duplicates_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race-duplicate.db");
    let course_id = seed_course(&path, None, false);

    let outcomes = race(&path, 12, move |_| CourseAdmission {
        course_id,
        applicant: applicant("SAME-0001".to_string()),
        member_class: None,
        payment_proof: None,
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|rejection| *rejection == AdmissionRejection::DuplicateRegistration));
}
