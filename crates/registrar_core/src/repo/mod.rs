//! Registration store: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Own all durable state (resources, registrations, profiles,
//!   announcements).
//! - Provide the atomic primitives the engine relies on: serialized
//!   admission scopes and all-or-nothing batches.
//! - Translate storage-level constraint failures into semantic errors.
//!
//! # Invariants
//! - A unique-index violation is never reported as a generic DB failure;
//!   callers receive `RepoError::UniqueViolation` naming the table/columns.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use rusqlite::ffi;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod announcement_repo;
pub mod course_repo;
pub mod event_repo;
pub mod registration_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every store contract.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound {
        entity: &'static str,
        id: Uuid,
    },
    /// A unique index rejected the write.
    UniqueViolation {
        table: String,
        columns: Vec<String>,
    },
    InvalidData(String),
}

impl RepoError {
    /// Whether this is a unique violation on exactly `table(columns)`.
    pub fn is_unique_violation(&self, table: &str, columns: &[&str]) -> bool {
        match self {
            Self::UniqueViolation {
                table: actual_table,
                columns: actual_columns,
            } => {
                actual_table == table
                    && actual_columns.len() == columns.len()
                    && actual_columns.iter().zip(columns).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UniqueViolation { table, columns } => write!(
                f,
                "unique constraint violated on {table}({})",
                columns.join(", ")
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let Some((table, columns)) = unique_violation_target(&value) {
            return Self::UniqueViolation { table, columns };
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Extracts `table` and `columns` from SQLite's
/// `UNIQUE constraint failed: t.a, t.b` message.
fn unique_violation_target(err: &rusqlite::Error) -> Option<(String, Vec<String>)> {
    let rusqlite::Error::SqliteFailure(failure, Some(message)) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }
    if !matches!(
        failure.extended_code,
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    ) {
        return None;
    }

    let targets = message.strip_prefix("UNIQUE constraint failed: ")?;
    let mut table: Option<String> = None;
    let mut columns = Vec::new();
    for target in targets.split(", ") {
        let (target_table, column) = target.trim().split_once('.')?;
        table.get_or_insert_with(|| target_table.to_string());
        columns.push(column.to_string());
    }
    Some((table?, columns))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
