//! TimeSlot domain model.
//!
//! # Responsibility
//! - Describe one concrete reservation of a user's time for a task.
//! - Validate the slot's own window; nothing else.
//!
//! # Invariants
//! - `start_at < end_at`; the window is half-open.
//! - `ext_data` distinguishes absent (`None`) from an empty map.
//! - Overlap and task ownership are checked by `crate::scheduling`.

use super::{normalize_instant, Provenance, TaskId, TimeWindow, UserId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type TimeSlotId = Uuid;

/// Open-ended per-slot metadata.
pub type ExtData = Map<String, Value>;

/// Semantic category of a reserved window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    /// Deep work; should not be interrupted.
    Focused,
    /// Can be moved or shortened by the owner.
    Flexible,
    /// Unavailable time.
    Blocked,
}

impl Allocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focused => "focused",
            Self::Flexible => "flexible",
            Self::Blocked => "blocked",
        }
    }
}

impl Display for Allocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Allocation {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "focused" => Ok(Self::Focused),
            "flexible" => Ok(Self::Flexible),
            "blocked" => Ok(Self::Blocked),
            other => Err(ValidationError::UnknownAllocation(other.to_string())),
        }
    }
}

/// A concrete reservation of `[start_at, end_at)` on one user's calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time_slot_id: TimeSlotId,
    pub user_id: UserId,
    pub task_id: TaskId,
    pub allocation: Allocation,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub ext_data: Option<ExtData>,
    pub provenance: Provenance,
}

impl TimeSlot {
    /// Creates a slot with a generated id, stamped by its owner.
    ///
    /// The window is normalized but not validated; call `validate()`.
    pub fn new(
        user_id: UserId,
        task_id: TaskId,
        allocation: Allocation,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            time_slot_id: Uuid::now_v7(),
            user_id,
            task_id,
            allocation,
            start_at: normalize_instant(start_at),
            end_at: normalize_instant(end_at),
            ext_data: None,
            provenance: Provenance::new(user_id, now),
        }
    }

    /// Attaches extension metadata.
    pub fn with_ext_data(mut self, ext_data: ExtData) -> Self {
        self.ext_data = Some(ext_data);
        self
    }

    /// Rejects windows without a strictly positive duration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        TimeWindow::try_new(self.start_at, self.end_at).map(|_| ())
    }
}
