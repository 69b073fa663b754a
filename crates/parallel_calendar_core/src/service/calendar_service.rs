//! Calendar use-case service.
//!
//! # Responsibility
//! - Provide task and time slot entry points scoped to an acting user.
//! - Delegate persistence and scheduling decisions to repositories.
//!
//! # Invariants
//! - Every entity is validated before it reaches a repository.
//! - An acting user only ever sees their own tasks and slots; another
//!   user's entity reads as `NotFound`.
//! - Service layer remains storage-agnostic.

use crate::cancel::CancellationToken;
use crate::model::{
    Allocation, ExtData, Task, TaskId, TimeSlot, TimeSlotId, TimeWindow, User, UserId,
};
use crate::repo::{
    EntityKind, RepoError, RepoResult, SqliteTaskRepository, SqliteTimeSlotRepository,
    SqliteUserRepository, TaskListQuery, TaskRepository, TimeSlotListQuery, TimeSlotRepository,
    UserRepository,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
}

/// Replacement values for an existing task.
pub type TaskChanges = NewTask;

/// Input for reserving a window.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTimeSlot {
    pub task_id: TaskId,
    pub allocation: Allocation,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub ext_data: Option<ExtData>,
}

/// Replacement values for an existing slot; every mutable field is set.
pub type TimeSlotChanges = NewTimeSlot;

/// Use-case service over user, task and time slot repositories.
pub struct CalendarService<U, T, S>
where
    U: UserRepository,
    T: TaskRepository,
    S: TimeSlotRepository,
{
    users: U,
    tasks: T,
    slots: S,
}

/// Service wired to SQLite repositories on one connection.
pub type SqliteCalendarService<'conn> = CalendarService<
    SqliteUserRepository<'conn>,
    SqliteTaskRepository<'conn>,
    SqliteTimeSlotRepository<'conn>,
>;

impl<'conn> SqliteCalendarService<'conn> {
    /// Builds SQLite repositories over `conn`, checking the schema once per
    /// repository.
    pub fn sqlite(
        conn: &'conn Connection,
        cancellation: Option<CancellationToken>,
    ) -> RepoResult<Self> {
        SqliteUserRepository::try_new(conn)?;
        SqliteTaskRepository::try_new(conn)?;
        SqliteTimeSlotRepository::try_new(conn)?;
        Ok(Self::on_store(conn, cancellation))
    }

    /// Builds SQLite repositories over a connection checked out from a
    /// `CalendarStore`, which verified the schema when it opened.
    pub(crate) fn on_store(
        conn: &'conn Connection,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        let mut slots = SqliteTimeSlotRepository::on_migrated(conn);
        if let Some(token) = cancellation {
            slots = slots.with_cancellation(token);
        }
        Self::new(
            SqliteUserRepository::on_migrated(conn),
            SqliteTaskRepository::on_migrated(conn),
            slots,
        )
    }
}

impl<U, T, S> CalendarService<U, T, S>
where
    U: UserRepository,
    T: TaskRepository,
    S: TimeSlotRepository,
{
    pub fn new(users: U, tasks: T, slots: S) -> Self {
        Self {
            users,
            tasks,
            slots,
        }
    }

    /// Registers a self-owned user.
    pub fn register_user(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> RepoResult<User> {
        let user = User::new(name, email, None, Utc::now());
        user.validate()?;
        self.users.create_user(&user)
    }

    pub fn get_user(&self, id: UserId) -> RepoResult<User> {
        self.users.get_user(id)
    }

    pub fn create_task(&self, actor: UserId, input: NewTask) -> RepoResult<Task> {
        let task = Task::new(actor, input.title, input.description, Utc::now());
        task.validate()?;
        self.tasks.create_task(&task)
    }

    pub fn get_task(&self, actor: UserId, id: TaskId) -> RepoResult<Task> {
        let task = self.tasks.get_task(id)?;
        if task.user_id != actor {
            return Err(RepoError::not_found(EntityKind::Task, id));
        }
        Ok(task)
    }

    /// Lists the actor's tasks oldest first.
    pub fn list_tasks(
        &self,
        actor: UserId,
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<Task>> {
        self.tasks.list_tasks(&TaskListQuery {
            user_id: actor,
            limit,
            offset,
        })
    }

    /// Replaces title and description. Id, owner and creation stamps are
    /// kept from the stored task.
    pub fn update_task(
        &self,
        actor: UserId,
        id: TaskId,
        changes: TaskChanges,
    ) -> RepoResult<Task> {
        let stored = self.get_task(actor, id)?;
        let task = Task {
            title: changes.title,
            description: changes.description,
            provenance: stored.provenance.touched(actor, Utc::now()),
            ..stored
        };
        task.validate()?;
        self.tasks.update_task(&task)
    }

    /// Hard-deletes a task. Slots referencing it are left in place.
    pub fn delete_task(&self, actor: UserId, id: TaskId) -> RepoResult<()> {
        self.tasks.delete_owned_task(actor, id)
    }

    /// Reserves a window on the actor's calendar.
    ///
    /// # Errors
    /// - `Validation` for an empty or reversed window.
    /// - `NotFound` when the task does not exist.
    /// - `TaskOwnershipMismatch` when the task belongs to someone else.
    /// - `SchedulingConflict` listing every intersecting slot.
    pub fn schedule(&self, actor: UserId, input: NewTimeSlot) -> RepoResult<TimeSlot> {
        let mut slot = TimeSlot::new(
            actor,
            input.task_id,
            input.allocation,
            input.start_at,
            input.end_at,
            Utc::now(),
        );
        slot.ext_data = input.ext_data;
        slot.validate()?;
        self.slots.create_time_slot(&slot)
    }

    pub fn get_time_slot(&self, actor: UserId, id: TimeSlotId) -> RepoResult<TimeSlot> {
        let slot = self.slots.get_time_slot(id)?;
        if slot.user_id != actor {
            return Err(RepoError::not_found(EntityKind::TimeSlot, id));
        }
        Ok(slot)
    }

    /// Lists the actor's slots, optionally restricted to those intersecting
    /// `window`, earliest first.
    pub fn list_time_slots(
        &self,
        actor: UserId,
        window: Option<TimeWindow>,
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<TimeSlot>> {
        self.slots.list_time_slots(&TimeSlotListQuery {
            user_id: actor,
            window,
            limit,
            offset,
        })
    }

    /// Moves or edits a slot. The slot never conflicts with its own stored
    /// window.
    pub fn reschedule(
        &self,
        actor: UserId,
        id: TimeSlotId,
        changes: TimeSlotChanges,
    ) -> RepoResult<TimeSlot> {
        let mut slot = TimeSlot::new(
            actor,
            changes.task_id,
            changes.allocation,
            changes.start_at,
            changes.end_at,
            Utc::now(),
        );
        slot.time_slot_id = id;
        slot.ext_data = changes.ext_data;
        slot.validate()?;
        self.slots.update_time_slot(&slot)
    }

    /// Removes the slot in one owner-scoped statement; the stored row is
    /// never decoded.
    pub fn delete_time_slot(&self, actor: UserId, id: TimeSlotId) -> RepoResult<()> {
        self.slots.delete_owned_time_slot(actor, id)
    }
}
