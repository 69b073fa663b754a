//! User repository contracts and SQLite implementation.

use super::{ensure_connection_ready, EntityKind, RepoError, RepoResult};
use crate::convert::{uuid_to_db, UserRow};
use crate::model::{User, UserId};
use rusqlite::{params, Connection, OptionalExtension};

const USER_COLUMNS: [&str; 7] = [
    "user_id",
    "name",
    "email",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
];

const USER_SELECT_SQL: &str = "SELECT
    user_id,
    name,
    email,
    created_at,
    updated_at,
    created_by,
    updated_by
FROM users";

/// Repository interface for calendar owners.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<User>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Builds a repository after verifying the connection is migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "users", &USER_COLUMNS)?;
        Ok(Self::on_migrated(conn))
    }

    pub(crate) fn on_migrated(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<User> {
        user.validate()?;

        let row = UserRow::from_domain(user);
        self.conn.execute(
            "INSERT INTO users (
                user_id,
                name,
                email,
                created_at,
                updated_at,
                created_by,
                updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                row.user_id,
                row.name,
                row.email,
                row.created_at(),
                row.updated_at(),
                row.created_by(),
                row.updated_by(),
            ],
        )?;

        self.get_user(user.user_id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<User> {
        let row = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE user_id = ?1;"),
                [uuid_to_db(id)],
                UserRow::from_row,
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found(EntityKind::User, id))?;
        Ok(row.into_domain()?)
    }
}
