//! Task repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `update_task` never rewrites the owner or creation stamps.
//! - Updates are scoped by owner; another user's task reads as missing.
//! - Deletes are hard deletes and leave referencing slots in place.

use super::{ensure_connection_ready, push_pagination, EntityKind, RepoError, RepoResult};
use crate::convert::{uuid_to_db, TaskRow};
use crate::model::{Task, TaskId, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

const TASK_COLUMNS: [&str; 8] = [
    "task_id",
    "user_id",
    "title",
    "task_description",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
];

const TASK_SELECT_SQL: &str = "SELECT
    task_id,
    user_id,
    title,
    task_description,
    created_at,
    updated_at,
    created_by,
    updated_by
FROM tasks";

/// Query options for listing one user's tasks.
#[derive(Debug, Clone)]
pub struct TaskListQuery {
    pub user_id: UserId,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl TaskListQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            limit: None,
            offset: 0,
        }
    }
}

/// Repository interface for task CRUD operations.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId) -> RepoResult<Task>;
    /// Lists by `created_at ASC, task_id ASC`.
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Rewrites title, description and update stamps of the task with the
    /// same id and owner; `NotFound` otherwise.
    fn update_task(&self, task: &Task) -> RepoResult<Task>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Deletes the task only when `owner` owns it; `NotFound` otherwise.
    fn delete_owned_task(&self, owner: UserId, id: TaskId) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "tasks", &TASK_COLUMNS)?;
        Ok(Self::on_migrated(conn))
    }

    pub(crate) fn on_migrated(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn delete_where(&self, id: TaskId, owner: Option<UserId>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tasks
             WHERE task_id = ?1
               AND (?2 IS NULL OR user_id = ?2);",
            params![uuid_to_db(id), owner.map(uuid_to_db)],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Task, id));
        }

        Ok(())
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<Task> {
        task.validate()?;

        let row = TaskRow::from_domain(task);
        self.conn.execute(
            "INSERT INTO tasks (
                task_id,
                user_id,
                title,
                task_description,
                created_at,
                updated_at,
                created_by,
                updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                row.task_id,
                row.user_id,
                row.title,
                row.task_description,
                row.created_at(),
                row.updated_at(),
                row.created_by(),
                row.updated_by(),
            ],
        )?;

        self.get_task(task.task_id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Task> {
        load_task(self.conn, id)?.ok_or_else(|| RepoError::not_found(EntityKind::Task, id))
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(uuid_to_db(query.user_id))];

        sql.push_str(" ORDER BY created_at ASC, task_id ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(TaskRow::from_row(row)?.into_domain()?);
        }

        Ok(tasks)
    }

    fn update_task(&self, task: &Task) -> RepoResult<Task> {
        task.validate()?;

        let row = TaskRow::from_domain(task);
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?2,
                task_description = ?3,
                updated_at = ?4,
                updated_by = ?5
             WHERE task_id = ?1
               AND user_id = ?6;",
            params![
                row.task_id,
                row.title,
                row.task_description,
                row.updated_at(),
                row.updated_by(),
                row.user_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Task, task.task_id));
        }

        self.get_task(task.task_id)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        self.delete_where(id, None)
    }

    fn delete_owned_task(&self, owner: UserId, id: TaskId) -> RepoResult<()> {
        self.delete_where(id, Some(owner))
    }
}

/// Reads one task on any connection or open transaction.
pub(crate) fn load_task(conn: &Connection, id: TaskId) -> RepoResult<Option<Task>> {
    let row = conn
        .query_row(
            &format!("{TASK_SELECT_SQL} WHERE task_id = ?1;"),
            [uuid_to_db(id)],
            TaskRow::from_row,
        )
        .optional()?;
    row.map(|row| row.into_domain().map_err(RepoError::from))
        .transpose()
}
