//! Scheduling domain model.
//!
//! # Responsibility
//! - Define the User, Task and TimeSlot records shared by every layer.
//! - Own single-entity validation (`validate()`), which never performs I/O.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that is never reused.
//! - Instants are UTC and carry millisecond precision only.
//! - Cross-entity rules (overlap, task ownership) live in `crate::scheduling`.

pub mod task;
pub mod time_slot;
pub mod user;
pub mod validation;
pub mod window;

pub use task::{Task, TaskId};
pub use time_slot::{Allocation, ExtData, TimeSlot, TimeSlotId};
pub use user::{User, UserId};
pub use validation::ValidationError;
pub use window::{normalize_instant, TimeWindow};

use chrono::{DateTime, Utc};

/// Created/updated stamps recorded on every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Provenance {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_by: UserId,
}

impl Provenance {
    /// Stamps a freshly created entity: both pairs point at `actor` and `now`.
    pub fn new(actor: UserId, now: DateTime<Utc>) -> Self {
        let now = normalize_instant(now);
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
        }
    }

    /// Returns a copy with the update pair replaced; creation stamps are kept.
    pub fn touched(self, actor: UserId, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: normalize_instant(now),
            updated_by: actor,
            ..self
        }
    }
}
