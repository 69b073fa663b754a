//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the calendar core.
//! - Apply schema migrations in deterministic order.
//! - Own the pooled `CalendarStore` handle shared by concurrent requests.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Every connection has `foreign_keys=ON` and a bounded busy timeout.

use rusqlite::ErrorCode;
use thiserror::Error;

pub mod migrations;
mod open;
mod store;

pub use open::{configure_connection, open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};
pub use store::{CalendarStore, PooledConn};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("pooled connection sees schema version {db_version}, expected {expected}")]
    PooledSchemaMismatch { db_version: u32, expected: u32 },
    #[error("pooled store needs a database file, got `{0}`")]
    InMemoryStorePath(String),
}

impl DbError {
    /// Whether the failure is an infrastructure condition a caller may retry
    /// (lock contention, I/O, pool exhaustion) rather than a logic error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
                failure.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
            ),
            Self::Sqlite(_) => false,
            Self::Pool(_) => true,
            Self::UnsupportedSchemaVersion { .. }
            | Self::PooledSchemaMismatch { .. }
            | Self::InMemoryStorePath(_) => false,
        }
    }

    /// Whether SQLite aborted the statement because of `sqlite3_interrupt`.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::OperationInterrupted
        )
    }
}
