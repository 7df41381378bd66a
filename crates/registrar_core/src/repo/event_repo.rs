//! Volunteer event repository contracts and SQLite implementation.
//!
//! # Invariants
//! - An event row and its ordered service list are written in one
//!   transaction; readers never see an event with a partial service list.
//! - Deleting an event cascades to its services and registrations.

use crate::identifier::SlugStore;
use crate::model::volunteer::{VolunteerEvent, VolunteerEventId, VolunteerService};
use crate::repo::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    slug,
    title,
    description,
    category,
    event_date,
    capacity,
    is_active,
    created_at,
    updated_at
FROM volunteer_events";

/// Repository interface for volunteer event authoring.
pub trait VolunteerEventRepository: SlugStore {
    fn create_event(&self, event: &VolunteerEvent) -> RepoResult<()>;
    /// Replaces event columns and the full service list atomically.
    fn update_event(&self, event: &VolunteerEvent) -> RepoResult<()>;
    fn get_event(&self, id: VolunteerEventId) -> RepoResult<Option<VolunteerEvent>>;
    fn delete_event(&self, id: VolunteerEventId) -> RepoResult<()>;
}

/// SQLite-backed volunteer event repository.
pub struct SqliteVolunteerEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVolunteerEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SlugStore for SqliteVolunteerEventRepository<'_> {
    fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM volunteer_events
                WHERE slug = ?1
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![slug, exclude_id.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl VolunteerEventRepository for SqliteVolunteerEventRepository<'_> {
    fn create_event(&self, event: &VolunteerEvent) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO volunteer_events (
                id,
                slug,
                title,
                description,
                category,
                event_date,
                capacity,
                is_active,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                event.id.to_string(),
                event.slug,
                event.title,
                event.description,
                event.category,
                event.event_date,
                event.capacity,
                bool_to_int(event.is_active),
                event.created_at,
                event.updated_at,
            ],
        )?;
        insert_services(&tx, event.id, &event.services)?;
        tx.commit()?;
        Ok(())
    }

    fn update_event(&self, event: &VolunteerEvent) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE volunteer_events
             SET
                slug = ?2,
                title = ?3,
                description = ?4,
                category = ?5,
                event_date = ?6,
                capacity = ?7,
                is_active = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                event.id.to_string(),
                event.slug,
                event.title,
                event.description,
                event.category,
                event.event_date,
                event.capacity,
                bool_to_int(event.is_active),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "volunteer event",
                id: event.id,
            });
        }

        tx.execute(
            "DELETE FROM volunteer_services WHERE event_id = ?1;",
            [event.id.to_string()],
        )?;
        insert_services(&tx, event.id, &event.services)?;
        tx.commit()?;
        Ok(())
    }

    fn get_event(&self, id: VolunteerEventId) -> RepoResult<Option<VolunteerEvent>> {
        load_event(self.conn, id)
    }

    fn delete_event(&self, id: VolunteerEventId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM volunteer_events WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "volunteer event",
                id,
            });
        }
        Ok(())
    }
}

/// Loads one event with its ordered services.
pub(crate) fn load_event(
    conn: &Connection,
    id: VolunteerEventId,
) -> RepoResult<Option<VolunteerEvent>> {
    let mut stmt = conn.prepare(&format!("{EVENT_SELECT_SQL} WHERE id = ?1;"))?;
    let event = stmt
        .query_row([id.to_string()], |row| Ok(parse_event_row(row)))
        .optional()?
        .transpose()?;

    let Some(mut event) = event else {
        return Ok(None);
    };
    event.services = load_services(conn, id)?;
    Ok(Some(event))
}

fn load_services(conn: &Connection, id: VolunteerEventId) -> RepoResult<Vec<VolunteerService>> {
    let mut stmt = conn.prepare(
        "SELECT name, max_volunteers
         FROM volunteer_services
         WHERE event_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut services = Vec::new();
    while let Some(row) = rows.next()? {
        services.push(VolunteerService {
            name: row.get("name")?,
            max_volunteers: row.get("max_volunteers")?,
        });
    }
    Ok(services)
}

fn insert_services(
    tx: &Transaction<'_>,
    event_id: VolunteerEventId,
    services: &[VolunteerService],
) -> RepoResult<()> {
    for (position, service) in services.iter().enumerate() {
        tx.execute(
            "INSERT INTO volunteer_services (event_id, position, name, max_volunteers)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                event_id.to_string(),
                position as i64,
                service.name,
                service.max_volunteers,
            ],
        )?;
    }
    Ok(())
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<VolunteerEvent> {
    let id_text: String = row.get("id")?;
    Ok(VolunteerEvent {
        id: parse_uuid(&id_text, "volunteer_events.id")?,
        slug: row.get("slug")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        event_date: row.get("event_date")?,
        capacity: row.get("capacity")?,
        services: Vec::new(),
        is_active: parse_bool(row.get("is_active")?, "volunteer_events.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
