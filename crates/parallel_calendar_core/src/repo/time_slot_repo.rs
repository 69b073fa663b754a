//! TimeSlot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist time slots while upholding the per-user no-overlap and task
//!   ownership invariants.
//! - Provide windowed, paginated listing for one user's calendar.
//!
//! # Invariants
//! - Create and update run the snapshot read, the scheduling decision and
//!   the write inside one `BEGIN IMMEDIATE` transaction. SQLite admits one
//!   writer at a time, so two overlapping writes can never both commit.
//! - Any early return drops the transaction, which rolls it back.
//! - A cancelled token is honored while waiting for the write lock, after
//!   `BEGIN`, after the snapshot read and before commit. Statements running
//!   when the token fires are interrupted.
//! - Owner-scoped deletes never decode the stored row, so a slot with
//!   unreadable metadata can still be removed.

use super::task_repo::load_task;
use super::{
    ensure_connection_ready, push_pagination, EntityKind, ErrorKind, RepoError, RepoResult,
};
use crate::cancel::{CancellationToken, InterruptOnCancel};
use crate::convert::{instant_to_millis, millis_to_instant, parse_uuid, uuid_to_db, TimeSlotRow};
use crate::model::{Provenance, TimeSlot, TimeSlotId, TimeWindow, UserId};
use crate::scheduling::evaluate;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Transaction,
    TransactionBehavior,
};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

const TIME_SLOT_COLUMNS: [&str; 11] = [
    "time_slot_id",
    "user_id",
    "task_id",
    "allocation",
    "start_at",
    "end_at",
    "ext_data",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
];

const TIME_SLOT_SELECT_SQL: &str = "SELECT
    time_slot_id,
    user_id,
    task_id,
    allocation,
    start_at,
    end_at,
    ext_data,
    created_at,
    updated_at,
    created_by,
    updated_by
FROM time_slots";

/// Query options for listing one user's time slots.
#[derive(Debug, Clone)]
pub struct TimeSlotListQuery {
    pub user_id: UserId,
    /// Only slots intersecting this window are returned.
    pub window: Option<TimeWindow>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl TimeSlotListQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            window: None,
            limit: None,
            offset: 0,
        }
    }
}

/// Repository interface for time slot operations.
pub trait TimeSlotRepository {
    fn create_time_slot(&self, slot: &TimeSlot) -> RepoResult<TimeSlot>;
    fn get_time_slot(&self, id: TimeSlotId) -> RepoResult<TimeSlot>;
    /// Lists by `start_at ASC, time_slot_id ASC`.
    fn list_time_slots(&self, query: &TimeSlotListQuery) -> RepoResult<Vec<TimeSlot>>;
    /// Replaces the mutable fields of the stored slot with the same id and
    /// owner; `NotFound` otherwise.
    ///
    /// Creation stamps are taken from the stored row.
    fn update_time_slot(&self, slot: &TimeSlot) -> RepoResult<TimeSlot>;
    fn delete_time_slot(&self, id: TimeSlotId) -> RepoResult<()>;
    /// Deletes the slot only when `owner` owns it; `NotFound` otherwise.
    fn delete_owned_time_slot(&self, owner: UserId, id: TimeSlotId) -> RepoResult<()>;
}

/// SQLite-backed time slot repository.
pub struct SqliteTimeSlotRepository<'conn> {
    conn: &'conn Connection,
    cancellation: Option<CancellationToken>,
}

impl<'conn> SqliteTimeSlotRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "time_slots", &TIME_SLOT_COLUMNS)?;
        Ok(Self::on_migrated(conn))
    }

    /// Skips the readiness check for connections whose schema the caller
    /// already verified.
    pub(crate) fn on_migrated(conn: &'conn Connection) -> Self {
        Self {
            conn,
            cancellation: None,
        }
    }

    /// Attaches a token checked at each transaction checkpoint.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn checkpoint(&self) -> RepoResult<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(RepoError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Opens the immediate transaction.
    ///
    /// Without a token SQLite's busy timeout governs the lock wait. With one,
    /// the wait is split into short non-blocking attempts so a cancelled
    /// request stops waiting; the overall budget stays the busy timeout.
    fn begin_write(&self) -> RepoResult<Transaction<'conn>> {
        let Some(token) = &self.cancellation else {
            return Ok(Transaction::new_unchecked(
                self.conn,
                TransactionBehavior::Immediate,
            )?);
        };

        let budget_ms: i64 = self
            .conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))?;
        let budget = Duration::from_millis(u64::try_from(budget_ms).unwrap_or(0));
        let deadline = Instant::now() + budget;

        self.conn.busy_timeout(Duration::ZERO)?;
        let result = loop {
            if token.is_cancelled() {
                break Err(RepoError::Cancelled);
            }
            match Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate) {
                Ok(tx) => break Ok(tx),
                Err(err) if is_busy(&err) && Instant::now() < deadline => {
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(err) => break Err(RepoError::from(err)),
            }
        };
        self.conn.busy_timeout(budget)?;
        result
    }

    fn watch_interrupts(&self) -> Option<InterruptOnCancel> {
        self.cancellation
            .as_ref()
            .map(|token| InterruptOnCancel::watch(self.conn, token))
    }

    fn create_in_tx(&self, slot: &TimeSlot) -> RepoResult<TimeSlot> {
        slot.validate()?;
        let row = TimeSlotRow::from_domain(slot)?;

        let tx = self.begin_write()?;
        // Declared after `tx` so it stops before any rollback runs.
        let interrupts = self.watch_interrupts();
        self.checkpoint()?;

        let task = load_task(&tx, slot.task_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Task, slot.task_id))?;
        let existing = load_intersecting(&tx, slot.user_id, slot.start_at, slot.end_at, None)?;
        self.checkpoint()?;

        evaluate(slot, None, &task, &existing)?;

        tx.execute(
            "INSERT INTO time_slots (
                time_slot_id,
                user_id,
                task_id,
                allocation,
                start_at,
                end_at,
                ext_data,
                created_at,
                updated_at,
                created_by,
                updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                row.time_slot_id,
                row.user_id,
                row.task_id,
                row.allocation,
                row.start_at,
                row.end_at,
                row.ext_data,
                row.created_at(),
                row.updated_at(),
                row.created_by(),
                row.updated_by(),
            ],
        )?;

        let stored = load_time_slot(&tx, slot.time_slot_id)?
            .ok_or_else(|| RepoError::InvalidData("inserted time slot not readable".into()))?;
        self.checkpoint()?;
        drop(interrupts);
        tx.commit()?;
        Ok(stored)
    }

    fn update_in_tx(&self, slot: &TimeSlot) -> RepoResult<TimeSlot> {
        slot.validate()?;

        let tx = self.begin_write()?;
        let interrupts = self.watch_interrupts();
        self.checkpoint()?;

        // Another user's slot is indistinguishable from a missing one.
        let origin = load_slot_origin(&tx, slot.time_slot_id)?
            .filter(|origin| origin.user_id == slot.user_id)
            .ok_or_else(|| RepoError::not_found(EntityKind::TimeSlot, slot.time_slot_id))?;
        let candidate = TimeSlot {
            user_id: origin.user_id,
            provenance: Provenance {
                created_at: origin.created_at,
                created_by: origin.created_by,
                ..slot.provenance
            },
            ..slot.clone()
        };
        let row = TimeSlotRow::from_domain(&candidate)?;

        let task = load_task(&tx, candidate.task_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Task, candidate.task_id))?;
        let existing = load_intersecting(
            &tx,
            candidate.user_id,
            candidate.start_at,
            candidate.end_at,
            Some(candidate.time_slot_id),
        )?;
        self.checkpoint()?;

        evaluate(&candidate, Some(candidate.time_slot_id), &task, &existing)?;

        tx.execute(
            "UPDATE time_slots
             SET
                task_id = ?2,
                allocation = ?3,
                start_at = ?4,
                end_at = ?5,
                ext_data = ?6,
                updated_at = ?7,
                updated_by = ?8
             WHERE time_slot_id = ?1;",
            params![
                row.time_slot_id,
                row.task_id,
                row.allocation,
                row.start_at,
                row.end_at,
                row.ext_data,
                row.updated_at(),
                row.updated_by(),
            ],
        )?;

        let stored = load_time_slot(&tx, candidate.time_slot_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::TimeSlot, candidate.time_slot_id))?;
        self.checkpoint()?;
        drop(interrupts);
        tx.commit()?;
        Ok(stored)
    }
}

impl TimeSlotRepository for SqliteTimeSlotRepository<'_> {
    fn create_time_slot(&self, slot: &TimeSlot) -> RepoResult<TimeSlot> {
        let started_at = Instant::now();
        let result = self.create_in_tx(slot);
        log_write("time_slot_create", slot.time_slot_id, started_at, &result);
        result
    }

    fn get_time_slot(&self, id: TimeSlotId) -> RepoResult<TimeSlot> {
        load_time_slot(self.conn, id)?.ok_or_else(|| RepoError::not_found(EntityKind::TimeSlot, id))
    }

    fn list_time_slots(&self, query: &TimeSlotListQuery) -> RepoResult<Vec<TimeSlot>> {
        let mut sql = format!("{TIME_SLOT_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(uuid_to_db(query.user_id))];

        if let Some(window) = query.window {
            sql.push_str(" AND start_at < ? AND ? < end_at");
            bind_values.push(Value::Integer(instant_to_millis(window.end())));
            bind_values.push(Value::Integer(instant_to_millis(window.start())));
        }

        sql.push_str(" ORDER BY start_at ASC, time_slot_id ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut slots = Vec::new();

        while let Some(row) = rows.next()? {
            slots.push(TimeSlotRow::from_row(row)?.into_domain()?);
        }

        Ok(slots)
    }

    fn update_time_slot(&self, slot: &TimeSlot) -> RepoResult<TimeSlot> {
        let started_at = Instant::now();
        let result = self.update_in_tx(slot);
        log_write("time_slot_update", slot.time_slot_id, started_at, &result);
        result
    }

    fn delete_time_slot(&self, id: TimeSlotId) -> RepoResult<()> {
        self.delete_where(id, None)
    }

    fn delete_owned_time_slot(&self, owner: UserId, id: TimeSlotId) -> RepoResult<()> {
        self.delete_where(id, Some(owner))
    }
}

impl SqliteTimeSlotRepository<'_> {
    fn delete_where(&self, id: TimeSlotId, owner: Option<UserId>) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.checkpoint().and_then(|()| {
            let changed = self.conn.execute(
                "DELETE FROM time_slots
                 WHERE time_slot_id = ?1
                   AND (?2 IS NULL OR user_id = ?2);",
                params![uuid_to_db(id), owner.map(uuid_to_db)],
            )?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::TimeSlot, id));
            }
            Ok(())
        });
        log_write("time_slot_delete", id, started_at, &result);
        result
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Owner and creation stamps of a stored slot.
struct SlotOrigin {
    user_id: UserId,
    created_at: DateTime<Utc>,
    created_by: UserId,
}

fn load_slot_origin(conn: &Connection, id: TimeSlotId) -> RepoResult<Option<SlotOrigin>> {
    let raw = conn
        .query_row(
            "SELECT user_id, created_at, created_by
             FROM time_slots
             WHERE time_slot_id = ?1;",
            [uuid_to_db(id)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((user_id, created_at, created_by)) = raw else {
        return Ok(None);
    };
    Ok(Some(SlotOrigin {
        user_id: parse_uuid(&user_id, "time_slots.user_id")?,
        created_at: millis_to_instant(created_at, "time_slots.created_at")?,
        created_by: parse_uuid(&created_by, "time_slots.created_by")?,
    }))
}

fn load_time_slot(conn: &Connection, id: TimeSlotId) -> RepoResult<Option<TimeSlot>> {
    let row = conn
        .query_row(
            &format!("{TIME_SLOT_SELECT_SQL} WHERE time_slot_id = ?1;"),
            [uuid_to_db(id)],
            TimeSlotRow::from_row,
        )
        .optional()?;
    row.map(|row| row.into_domain().map_err(RepoError::from))
        .transpose()
}

/// Snapshot of the user's slots intersecting `[start, end)`.
fn load_intersecting(
    conn: &Connection,
    user_id: UserId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    excluding: Option<TimeSlotId>,
) -> RepoResult<Vec<TimeSlot>> {
    let mut stmt = conn.prepare(&format!(
        "{TIME_SLOT_SELECT_SQL}
         WHERE user_id = ?1
           AND start_at < ?2
           AND ?3 < end_at
           AND (?4 IS NULL OR time_slot_id <> ?4)
         ORDER BY start_at ASC, time_slot_id ASC;"
    ))?;
    let mut rows = stmt.query(params![
        uuid_to_db(user_id),
        instant_to_millis(end),
        instant_to_millis(start),
        excluding.map(uuid_to_db),
    ])?;

    let mut slots = Vec::new();
    while let Some(row) = rows.next()? {
        slots.push(TimeSlotRow::from_row(row)?.into_domain()?);
    }
    Ok(slots)
}

fn log_write<T>(
    event: &'static str,
    time_slot_id: TimeSlotId,
    started_at: Instant,
    result: &RepoResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    let Err(err) = result else {
        info!(
            "event={} module=repo status=ok time_slot_id={} duration_ms={}",
            event, time_slot_id, duration_ms
        );
        return;
    };

    match err {
        RepoError::SchedulingConflict { conflicting, .. } => warn!(
            "event={} module=repo status=rejected time_slot_id={} error_code={} conflicts={} duration_ms={}",
            event,
            time_slot_id,
            err.kind().code(),
            conflicting.len(),
            duration_ms
        ),
        _ if matches!(
            err.kind(),
            ErrorKind::Internal | ErrorKind::StorageUnavailable | ErrorKind::MalformedMetadata
        ) =>
        {
            error!(
                "event={} module=repo status=error time_slot_id={} error_code={} duration_ms={} error={}",
                event,
                time_slot_id,
                err.kind().code(),
                duration_ms,
                err
            )
        }
        _ => warn!(
            "event={} module=repo status=rejected time_slot_id={} error_code={} duration_ms={}",
            event,
            time_slot_id,
            err.kind().code(),
            duration_ms
        ),
    }
}
