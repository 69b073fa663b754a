//! Pooled store handle.
//!
//! # Responsibility
//! - Build the connection pool once per process, after migrations succeed.
//! - Hand out scoped connections to concurrent requests.
//!
//! # Invariants
//! - Pool connections are configured by `configure_connection` on creation.
//! - The schema is verified once, on the first pooled connection; requests
//!   trust it afterwards.
//! - The store always sits on a database file shared by every connection.
//! - Dropping the store closes every idle connection; checked-out
//!   connections close when their guard drops.

use super::migrations::{current_user_version, latest_version};
use super::open::{configure_connection, open_db};
use super::{DbError, DbResult};
use crate::config::CoreConfig;
use log::info;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Lower bound for the pool checkout wait; r2d2 requires a positive value
/// even when the SQLite busy timeout is zero.
const MIN_CHECKOUT_TIMEOUT: Duration = Duration::from_millis(100);

/// Connection checked out from the store pool.
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Explicitly constructed handle over the calendar database.
#[derive(Clone)]
pub struct CalendarStore {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl CalendarStore {
    /// Opens the database described by `config`.
    pub fn open(config: &CoreConfig) -> DbResult<Self> {
        Self::open_path(&config.db_path, config.pool_size, config.busy_timeout)
    }

    /// Migrates the database at `path` and builds a pool of `pool_size`
    /// connections on top of it.
    ///
    /// # Side effects
    /// - Creates the database file when missing.
    /// - Emits `store_open` logging events.
    pub fn open_path(
        path: impl AsRef<Path>,
        pool_size: u32,
        busy_timeout: Duration,
    ) -> DbResult<Self> {
        let started_at = Instant::now();
        let path = path.as_ref().to_path_buf();
        if is_in_memory_path(&path) {
            return Err(DbError::InMemoryStorePath(path.display().to_string()));
        }

        // Migrate once on a dedicated connection so pooled connections never
        // race on schema setup.
        drop(open_db(&path)?);

        let manager = SqliteConnectionManager::file(&path)
            .with_init(move |conn| configure_connection(conn, busy_timeout));
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(busy_timeout.max(MIN_CHECKOUT_TIMEOUT))
            .build(manager)?;
        verify_pooled_schema(&*pool.get()?)?;

        info!(
            "event=store_open module=db status=ok pool_size={} duration_ms={}",
            pool_size,
            started_at.elapsed().as_millis()
        );
        Ok(Self { pool, path })
    }

    /// Checks out one connection for the duration of a request.
    pub fn connection(&self) -> DbResult<PooledConn> {
        Ok(self.pool.get()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_in_memory_path(path: &Path) -> bool {
    let text = path.to_string_lossy();
    let text = text.trim();
    text.is_empty() || text == ":memory:" || text.starts_with("file::memory:")
}

fn verify_pooled_schema(conn: &rusqlite::Connection) -> DbResult<()> {
    let db_version = current_user_version(conn)?;
    let expected = latest_version();
    if db_version != expected {
        return Err(DbError::PooledSchemaMismatch {
            db_version,
            expected,
        });
    }
    Ok(())
}
