use crate::model::{Task, TaskId, TimeSlot, TimeSlotId, UserId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Cross-entity rule violations for a candidate slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    /// Candidate window intersects existing slots of the same owner.
    #[error("time slot {time_slot_id} conflicts with {} existing slot(s)", .conflicting.len())]
    Conflict {
        time_slot_id: TimeSlotId,
        conflicting: Vec<TimeSlotId>,
    },
    /// Candidate references a task owned by another user.
    #[error("task {task_id} belongs to user {task_owner}, not slot owner {slot_owner}")]
    TaskOwnershipMismatch {
        task_id: TaskId,
        task_owner: UserId,
        slot_owner: UserId,
    },
}

/// Half-open interval intersection: `a.start < b.end && b.start < a.end`.
pub fn windows_intersect(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Returns ids of `existing` slots that collide with `candidate`.
///
/// Only slots of the candidate's owner count. The candidate's own id and the
/// `replacing` id are skipped so an update never conflicts with itself.
/// Result is ordered by `start_at ASC, time_slot_id ASC`.
pub fn find_conflicts(
    candidate: &TimeSlot,
    replacing: Option<TimeSlotId>,
    existing: &[TimeSlot],
) -> Vec<TimeSlotId> {
    let mut hits: Vec<&TimeSlot> = existing
        .iter()
        .filter(|slot| slot.user_id == candidate.user_id)
        .filter(|slot| slot.time_slot_id != candidate.time_slot_id)
        .filter(|slot| Some(slot.time_slot_id) != replacing)
        .filter(|slot| {
            windows_intersect(
                slot.start_at,
                slot.end_at,
                candidate.start_at,
                candidate.end_at,
            )
        })
        .collect();
    hits.sort_by(|a, b| {
        a.start_at
            .cmp(&b.start_at)
            .then_with(|| a.time_slot_id.cmp(&b.time_slot_id))
    });
    hits.into_iter().map(|slot| slot.time_slot_id).collect()
}

/// Confirms the referenced task is owned by the slot owner.
pub fn check_task_ownership(candidate: &TimeSlot, task: &Task) -> Result<(), SchedulingError> {
    if task.user_id != candidate.user_id {
        return Err(SchedulingError::TaskOwnershipMismatch {
            task_id: task.task_id,
            task_owner: task.user_id,
            slot_owner: candidate.user_id,
        });
    }
    Ok(())
}

/// Full commit decision for a candidate slot.
///
/// Ownership is checked first; a cross-user reference is rejected regardless
/// of calendar state.
pub fn evaluate(
    candidate: &TimeSlot,
    replacing: Option<TimeSlotId>,
    task: &Task,
    existing: &[TimeSlot],
) -> Result<(), SchedulingError> {
    check_task_ownership(candidate, task)?;

    let conflicting = find_conflicts(candidate, replacing, existing);
    if !conflicting.is_empty() {
        return Err(SchedulingError::Conflict {
            time_slot_id: candidate.time_slot_id,
            conflicting,
        });
    }
    Ok(())
}
