//! Announcement repository with temporal exclusivity enforcement.
//!
//! # Responsibility
//! - Persist announcements.
//! - Sweep stale active announcements whenever one becomes active.
//!
//! # Invariants
//! - Activation of a record dated `D` and the deactivation of every other
//!   active record dated strictly before `D` commit together or not at all.
//! - Records dated on or after `D` are never touched by a sweep.

use crate::model::announcement::{Announcement, AnnouncementId};
use crate::repo::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const ANNOUNCEMENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    body,
    image_ref,
    effective_date,
    is_active,
    created_at,
    updated_at
FROM announcements";

/// Repository interface for announcements.
///
/// Every method that can leave a record active returns the ids it swept.
pub trait AnnouncementRepository {
    fn insert_announcement(&self, announcement: &Announcement) -> RepoResult<Vec<AnnouncementId>>;
    /// Replaces mutable columns of an existing announcement.
    fn update_announcement(&self, announcement: &Announcement)
        -> RepoResult<Vec<AnnouncementId>>;
    /// Marks `id` active at `effective_date` and sweeps older active records.
    fn activate(
        &self,
        id: AnnouncementId,
        effective_date: NaiveDate,
    ) -> RepoResult<Vec<AnnouncementId>>;
    fn deactivate(&self, id: AnnouncementId) -> RepoResult<()>;
    fn get_announcement(&self, id: AnnouncementId) -> RepoResult<Option<Announcement>>;
    /// Lists announcements by `effective_date` DESC, newest first.
    fn list_announcements(&self, active_only: bool) -> RepoResult<Vec<Announcement>>;
}

/// SQLite-backed announcement repository.
pub struct SqliteAnnouncementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnnouncementRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AnnouncementRepository for SqliteAnnouncementRepository<'_> {
    fn insert_announcement(&self, announcement: &Announcement) -> RepoResult<Vec<AnnouncementId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let swept = if announcement.is_active {
            sweep_older_than(&tx, announcement.id, announcement.effective_date)?
        } else {
            Vec::new()
        };
        tx.execute(
            "INSERT INTO announcements (
                id,
                title,
                body,
                image_ref,
                effective_date,
                is_active,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                announcement.id.to_string(),
                announcement.title,
                announcement.body,
                announcement.image_ref,
                announcement.effective_date,
                bool_to_int(announcement.is_active),
                announcement.created_at,
                announcement.updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(swept)
    }

    fn update_announcement(
        &self,
        announcement: &Announcement,
    ) -> RepoResult<Vec<AnnouncementId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE announcements
             SET
                title = ?2,
                body = ?3,
                image_ref = ?4,
                effective_date = ?5,
                is_active = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                announcement.id.to_string(),
                announcement.title,
                announcement.body,
                announcement.image_ref,
                announcement.effective_date,
                bool_to_int(announcement.is_active),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "announcement",
                id: announcement.id,
            });
        }

        let swept = if announcement.is_active {
            sweep_older_than(&tx, announcement.id, announcement.effective_date)?
        } else {
            Vec::new()
        };
        tx.commit()?;
        Ok(swept)
    }

    fn activate(
        &self,
        id: AnnouncementId,
        effective_date: NaiveDate,
    ) -> RepoResult<Vec<AnnouncementId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE announcements
             SET is_active = 1,
                 effective_date = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), effective_date],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "announcement",
                id,
            });
        }
        let swept = sweep_older_than(&tx, id, effective_date)?;
        tx.commit()?;
        Ok(swept)
    }

    fn deactivate(&self, id: AnnouncementId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE announcements
             SET is_active = 0,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "announcement",
                id,
            });
        }
        Ok(())
    }

    fn get_announcement(&self, id: AnnouncementId) -> RepoResult<Option<Announcement>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ANNOUNCEMENT_SELECT_SQL} WHERE id = ?1;"))?;
        stmt.query_row([id.to_string()], |row| Ok(parse_announcement_row(row)))
            .optional()?
            .transpose()
    }

    fn list_announcements(&self, active_only: bool) -> RepoResult<Vec<Announcement>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ANNOUNCEMENT_SELECT_SQL}
             WHERE (?1 = 0 OR is_active = 1)
             ORDER BY effective_date DESC, created_at DESC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(active_only)])?;
        let mut announcements = Vec::new();
        while let Some(row) = rows.next()? {
            announcements.push(parse_announcement_row(row)?);
        }
        Ok(announcements)
    }
}

/// Deactivates every other active record dated strictly before `date`.
fn sweep_older_than(
    tx: &Transaction<'_>,
    keep_id: AnnouncementId,
    date: NaiveDate,
) -> RepoResult<Vec<AnnouncementId>> {
    let mut stmt = tx.prepare(
        "SELECT id
         FROM announcements
         WHERE is_active = 1
           AND effective_date < ?1
           AND id <> ?2;",
    )?;
    let mut rows = stmt.query(params![date, keep_id.to_string()])?;
    let mut swept = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        swept.push(parse_uuid(&id_text, "announcements.id")?);
    }

    for id in &swept {
        tx.execute(
            "UPDATE announcements
             SET is_active = 0,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id.to_string()],
        )?;
    }
    Ok(swept)
}

fn parse_announcement_row(row: &Row<'_>) -> RepoResult<Announcement> {
    let id_text: String = row.get("id")?;
    Ok(Announcement {
        id: parse_uuid(&id_text, "announcements.id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        image_ref: row.get("image_ref")?,
        effective_date: row.get("effective_date")?,
        is_active: parse_bool(row.get("is_active")?, "announcements.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
