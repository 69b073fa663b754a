//! Calendar owner identity.

use super::{Provenance, ValidationError};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// Identity owning tasks and time slots. Referenced, never owned, by them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub provenance: Provenance,
}

impl User {
    /// Creates a user with a generated id. A self-registered user is its own
    /// creator when `actor` is `None`.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        let user_id = Uuid::now_v7();
        Self {
            user_id,
            name: name.into(),
            email: email.into(),
            provenance: Provenance::new(actor.unwrap_or(user_id), now),
        }
    }

    /// Checks name presence and contact address shape.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}
