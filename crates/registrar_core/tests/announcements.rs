use chrono::NaiveDate;
use registrar_core::db::open_db_in_memory;
use registrar_core::model::announcement::{Announcement, AnnouncementDraft, AnnouncementPatch};
use registrar_core::{
    AnnouncementRepository, AnnouncementService, RepoError, SqliteAnnouncementRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn draft(title: &str, effective_date: NaiveDate, is_active: bool) -> AnnouncementDraft {
    AnnouncementDraft {
        title: title.to_string(),
        body: "Detalles en secretaría.".to_string(),
        image_ref: None,
        effective_date,
        is_active,
    }
}

fn is_active(conn: &Connection, id: Uuid) -> bool {
    SqliteAnnouncementRepository::new(conn)
        .get_announcement(id)
        .unwrap()
        .unwrap()
        .is_active
}

#[test]
fn activating_march_sweeps_february_and_keeps_april() {
    let conn = open_db_in_memory().unwrap();
    let service = AnnouncementService::new(SqliteAnnouncementRepository::new(&conn));

    let february = service
        .create_announcement(&draft("Febrero", date(2024, 2, 1), true))
        .unwrap();
    let april = service
        .create_announcement(&draft("Abril", date(2024, 4, 1), true))
        .unwrap();
    // April's activation already swept February.
    assert_eq!(april.swept, vec![february.announcement.id]);

    service
        .update_announcement(
            february.announcement.id,
            &AnnouncementPatch {
                is_active: Some(true),
                ..AnnouncementPatch::default()
            },
        )
        .unwrap();
    assert!(is_active(&conn, february.announcement.id));

    let march = service
        .create_announcement(&draft("Marzo", date(2024, 3, 1), false))
        .unwrap();
    assert!(march.swept.is_empty());

    let activated = service
        .activate_announcement(march.announcement.id)
        .unwrap();
    assert_eq!(activated.swept, vec![february.announcement.id]);
    assert!(activated.announcement.is_active);

    assert!(!is_active(&conn, february.announcement.id));
    assert!(is_active(&conn, march.announcement.id));
    assert!(is_active(&conn, april.announcement.id));
}

#[test]
fn equal_dates_may_both_stay_active() {
    let conn = open_db_in_memory().unwrap();
    let service = AnnouncementService::new(SqliteAnnouncementRepository::new(&conn));

    let first = service
        .create_announcement(&draft("Uno", date(2024, 5, 1), true))
        .unwrap();
    let second = service
        .create_announcement(&draft("Dos", date(2024, 5, 1), true))
        .unwrap();
    assert!(second.swept.is_empty());

    let active = service.list_active_announcements().unwrap();
    let ids: Vec<_> = active.iter().map(|a| a.id).collect();
    assert!(ids.contains(&first.announcement.id));
    assert!(ids.contains(&second.announcement.id));
}

#[test]
fn list_active_is_newest_first_and_skips_inactive() {
    let conn = open_db_in_memory().unwrap();
    let service = AnnouncementService::new(SqliteAnnouncementRepository::new(&conn));

    let june = service
        .create_announcement(&draft("Junio", date(2024, 6, 1), true))
        .unwrap();
    let july = service
        .create_announcement(&draft("Julio", date(2024, 7, 1), true))
        .unwrap();
    service
        .create_announcement(&draft("Borrador", date(2024, 8, 1), false))
        .unwrap();
    // Re-activate June after July swept it; dates after June stay untouched.
    service.activate_announcement(june.announcement.id).unwrap();

    let active = service.list_active_announcements().unwrap();
    let titles: Vec<_> = active.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Julio", "Junio"]);
    assert!(is_active(&conn, july.announcement.id));
}

#[test]
fn moving_an_active_announcement_forward_sweeps_the_gap() {
    let conn = open_db_in_memory().unwrap();
    let service = AnnouncementService::new(SqliteAnnouncementRepository::new(&conn));

    let early = service
        .create_announcement(&draft("Temprano", date(2024, 1, 10), true))
        .unwrap();
    let late = service
        .create_announcement(&draft("Tarde", date(2024, 1, 5), true))
        .unwrap();
    assert!(late.swept.is_empty());

    let moved = service
        .update_announcement(
            late.announcement.id,
            &AnnouncementPatch {
                effective_date: Some(date(2024, 1, 20)),
                ..AnnouncementPatch::default()
            },
        )
        .unwrap();
    assert_eq!(moved.swept, vec![early.announcement.id]);
    assert_eq!(moved.announcement.effective_date, date(2024, 1, 20));
}

#[test]
fn failed_insert_rolls_back_the_sweep() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnouncementRepository::new(&conn);

    let older = Announcement::from_draft(&draft("Antiguo", date(2024, 2, 1), true));
    repo.insert_announcement(&older).unwrap();
    let future = Announcement::from_draft(&draft("Futuro", date(2024, 9, 1), false));
    repo.insert_announcement(&future).unwrap();

    // Reusing a primary key makes the insert fail after the sweep ran.
    let mut clash = Announcement::from_draft(&draft("Choque", date(2024, 3, 1), true));
    clash.id = future.id;
    let err = repo.insert_announcement(&clash).unwrap_err();
    assert!(err.is_unique_violation("announcements", &["id"]));

    assert!(is_active(&conn, older.id));
    assert_eq!(repo.list_announcements(false).unwrap().len(), 2);
}

#[test]
fn blank_title_and_unknown_ids_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = AnnouncementService::new(SqliteAnnouncementRepository::new(&conn));

    let err = service
        .create_announcement(&draft("   ", date(2024, 1, 1), true))
        .unwrap_err();
    assert_eq!(err.status_class(), 400);

    let err = service.activate_announcement(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.status_class(), 404);

    let repo = SqliteAnnouncementRepository::new(&conn);
    assert!(matches!(
        repo.deactivate(Uuid::new_v4()),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn deactivate_leaves_others_untouched() {
    let conn = open_db_in_memory().unwrap();
    let service = AnnouncementService::new(SqliteAnnouncementRepository::new(&conn));

    let a = service
        .create_announcement(&draft("A", date(2024, 9, 1), true))
        .unwrap();
    let b = service
        .create_announcement(&draft("B", date(2024, 9, 2), true))
        .unwrap();
    service
        .deactivate_announcement(b.announcement.id)
        .unwrap();

    assert!(!is_active(&conn, b.announcement.id));
    assert!(!is_active(&conn, a.announcement.id));
    assert!(service.list_active_announcements().unwrap().is_empty());
}
