//! Task domain model.
//!
//! # Invariants
//! - `title` is non-empty; whitespace is kept as given.
//! - `description` distinguishes absent (`None`) from empty (`Some("")`).
//! - Deleting a task never touches time slots referencing it.

use super::{Provenance, UserId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

/// A unit of work that may be scheduled into zero or many time slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub provenance: Provenance,
}

impl Task {
    /// Creates a task owned and stamped by `user_id`.
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::with_id(Uuid::now_v7(), user_id, title, description, now)
    }

    /// Creates a task with a caller-provided id (import paths, fixtures).
    pub fn with_id(
        task_id: TaskId,
        user_id: UserId,
        title: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            user_id,
            title: title.into(),
            description,
            provenance: Provenance::new(user_id, now),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        Ok(())
    }
}
