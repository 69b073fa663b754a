//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for users, tasks and
//!   time slots.
//! - Isolate SQLite query details from service orchestration.
//! - Run every slot check-then-write inside one immediate transaction.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`, conflicts) in
//!   addition to storage errors.

pub mod task_repo;
pub mod time_slot_repo;
pub mod user_repo;

pub use task_repo::{SqliteTaskRepository, TaskListQuery, TaskRepository};
pub use time_slot_repo::{SqliteTimeSlotRepository, TimeSlotListQuery, TimeSlotRepository};
pub use user_repo::{SqliteUserRepository, UserRepository};

use crate::convert::ConversionError;
use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::{TaskId, TimeSlotId, UserId, ValidationError};
use crate::scheduling::SchedulingError;
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity named by a `NotFound` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Task,
    TimeSlot,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Task => "task",
            Self::TimeSlot => "time slot",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification a boundary maps to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    SchedulingConflict,
    TaskOwnershipMismatch,
    NotFound,
    MalformedMetadata,
    StorageUnavailable,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "validation_failed",
            Self::SchedulingConflict => "scheduling_conflict",
            Self::TaskOwnershipMismatch => "task_ownership_mismatch",
            Self::NotFound => "not_found",
            Self::MalformedMetadata => "malformed_metadata",
            Self::StorageUnavailable => "storage_unavailable",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }

    /// HTTP-style status code.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::SchedulingConflict => 409,
            Self::TaskOwnershipMismatch => 422,
            Self::NotFound => 404,
            Self::MalformedMetadata => 500,
            Self::StorageUnavailable => 503,
            Self::Cancelled => 499,
            Self::Internal => 500,
        }
    }
}

/// Repository error for calendar persistence and scheduling decisions.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("time slot {time_slot_id} conflicts with {} existing slot(s)", .conflicting.len())]
    SchedulingConflict {
        time_slot_id: TimeSlotId,
        conflicting: Vec<TimeSlotId>,
    },
    #[error("task {task_id} belongs to user {task_owner}, not slot owner {slot_owner}")]
    TaskOwnershipMismatch {
        task_id: TaskId,
        task_owner: UserId,
        slot_owner: UserId,
    },
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: Uuid },
    #[error("malformed ext_data for time slot {time_slot_id}: {reason}")]
    MalformedMetadata {
        time_slot_id: TimeSlotId,
        reason: String,
    },
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] DbError),
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Db(DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("schema version {actual_version} does not match expected {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table missing: {0}")]
    MissingRequiredTable(&'static str),
    #[error("required column missing: {table}.{column}")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::SchedulingConflict { .. } => ErrorKind::SchedulingConflict,
            Self::TaskOwnershipMismatch { .. } => ErrorKind::TaskOwnershipMismatch,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MalformedMetadata { .. } => ErrorKind::MalformedMetadata,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Db(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: EntityKind, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_interrupted() {
            Self::Cancelled
        } else if value.is_transient() {
            Self::StorageUnavailable(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

impl From<SchedulingError> for RepoError {
    fn from(value: SchedulingError) -> Self {
        match value {
            SchedulingError::Conflict {
                time_slot_id,
                conflicting,
            } => Self::SchedulingConflict {
                time_slot_id,
                conflicting,
            },
            SchedulingError::TaskOwnershipMismatch {
                task_id,
                task_owner,
                slot_owner,
            } => Self::TaskOwnershipMismatch {
                task_id,
                task_owner,
                slot_owner,
            },
        }
    }
}

impl From<ConversionError> for RepoError {
    fn from(value: ConversionError) -> Self {
        match value {
            ConversionError::MalformedMetadata {
                time_slot_id,
                reason,
            } => Self::MalformedMetadata {
                time_slot_id,
                reason,
            },
            ConversionError::InvalidData(message) => Self::InvalidData(message),
        }
    }
}

/// Verifies the connection is migrated and `table` carries `columns`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Appends `LIMIT`/`OFFSET` clauses and their bind values.
pub(crate) fn push_pagination(
    sql: &mut String,
    binds: &mut Vec<rusqlite::types::Value>,
    limit: Option<u32>,
    offset: u32,
) {
    use rusqlite::types::Value;

    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        binds.push(Value::Integer(i64::from(limit)));
        if offset > 0 {
            sql.push_str(" OFFSET ?");
            binds.push(Value::Integer(i64::from(offset)));
        }
    } else if offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        binds.push(Value::Integer(i64::from(offset)));
    }
}
