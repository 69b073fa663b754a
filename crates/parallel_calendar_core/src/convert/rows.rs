//! Flat row images of the persisted tables.
//!
//! Each row struct mirrors its table column-for-column. `from_domain` never
//! fails for users and tasks; `into_domain` rejects anything the domain
//! would not accept.

use super::{
    decode_ext_data, encode_ext_data, instant_to_millis, millis_to_instant, parse_uuid,
    uuid_to_db, ConversionError, ConversionResult,
};
use crate::model::{Provenance, Task, TimeSlot, User};
use rusqlite::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProvenanceColumns {
    created_at: i64,
    updated_at: i64,
    created_by: String,
    updated_by: String,
}

impl ProvenanceColumns {
    fn from_domain(provenance: &Provenance) -> Self {
        Self {
            created_at: instant_to_millis(provenance.created_at),
            updated_at: instant_to_millis(provenance.updated_at),
            created_by: uuid_to_db(provenance.created_by),
            updated_by: uuid_to_db(provenance.updated_by),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            created_by: row.get("created_by")?,
            updated_by: row.get("updated_by")?,
        })
    }

    fn into_domain(self) -> ConversionResult<Provenance> {
        Ok(Provenance {
            created_at: millis_to_instant(self.created_at, "created_at")?,
            updated_at: millis_to_instant(self.updated_at, "updated_at")?,
            created_by: parse_uuid(&self.created_by, "created_by")?,
            updated_by: parse_uuid(&self.updated_by, "updated_by")?,
        })
    }
}

/// Row image of `users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    provenance: ProvenanceColumns,
}

impl UserRow {
    pub fn from_domain(user: &User) -> Self {
        Self {
            user_id: uuid_to_db(user.user_id),
            name: user.name.clone(),
            email: user.email.clone(),
            provenance: ProvenanceColumns::from_domain(&user.provenance),
        }
    }

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            provenance: ProvenanceColumns::from_row(row)?,
        })
    }

    pub fn into_domain(self) -> ConversionResult<User> {
        let user = User {
            user_id: parse_uuid(&self.user_id, "users.user_id")?,
            name: self.name,
            email: self.email,
            provenance: self.provenance.into_domain()?,
        };
        user.validate()
            .map_err(|err| ConversionError::InvalidData(format!("users row: {err}")))?;
        Ok(user)
    }

    pub fn created_at(&self) -> i64 {
        self.provenance.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.provenance.updated_at
    }

    pub fn created_by(&self) -> &str {
        &self.provenance.created_by
    }

    pub fn updated_by(&self) -> &str {
        &self.provenance.updated_by
    }
}

/// Row image of `tasks`. The description column is `task_description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub task_description: Option<String>,
    provenance: ProvenanceColumns,
}

impl TaskRow {
    pub fn from_domain(task: &Task) -> Self {
        Self {
            task_id: uuid_to_db(task.task_id),
            user_id: uuid_to_db(task.user_id),
            title: task.title.clone(),
            task_description: task.description.clone(),
            provenance: ProvenanceColumns::from_domain(&task.provenance),
        }
    }

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            task_id: row.get("task_id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            task_description: row.get("task_description")?,
            provenance: ProvenanceColumns::from_row(row)?,
        })
    }

    pub fn into_domain(self) -> ConversionResult<Task> {
        let task = Task {
            task_id: parse_uuid(&self.task_id, "tasks.task_id")?,
            user_id: parse_uuid(&self.user_id, "tasks.user_id")?,
            title: self.title,
            description: self.task_description,
            provenance: self.provenance.into_domain()?,
        };
        task.validate()
            .map_err(|err| ConversionError::InvalidData(format!("tasks row: {err}")))?;
        Ok(task)
    }

    pub fn created_at(&self) -> i64 {
        self.provenance.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.provenance.updated_at
    }

    pub fn created_by(&self) -> &str {
        &self.provenance.created_by
    }

    pub fn updated_by(&self) -> &str {
        &self.provenance.updated_by
    }
}

/// Row image of `time_slots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlotRow {
    pub time_slot_id: String,
    pub user_id: String,
    pub task_id: String,
    pub allocation: String,
    pub start_at: i64,
    pub end_at: i64,
    pub ext_data: Option<String>,
    provenance: ProvenanceColumns,
}

impl TimeSlotRow {
    /// Fails with `MalformedMetadata` when `ext_data` cannot be serialized.
    pub fn from_domain(slot: &TimeSlot) -> ConversionResult<Self> {
        Ok(Self {
            time_slot_id: uuid_to_db(slot.time_slot_id),
            user_id: uuid_to_db(slot.user_id),
            task_id: uuid_to_db(slot.task_id),
            allocation: slot.allocation.as_str().to_string(),
            start_at: instant_to_millis(slot.start_at),
            end_at: instant_to_millis(slot.end_at),
            ext_data: encode_ext_data(slot.ext_data.as_ref(), slot.time_slot_id)?,
            provenance: ProvenanceColumns::from_domain(&slot.provenance),
        })
    }

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            time_slot_id: row.get("time_slot_id")?,
            user_id: row.get("user_id")?,
            task_id: row.get("task_id")?,
            allocation: row.get("allocation")?,
            start_at: row.get("start_at")?,
            end_at: row.get("end_at")?,
            ext_data: row.get("ext_data")?,
            provenance: ProvenanceColumns::from_row(row)?,
        })
    }

    pub fn into_domain(self) -> ConversionResult<TimeSlot> {
        let time_slot_id = parse_uuid(&self.time_slot_id, "time_slots.time_slot_id")?;
        let allocation = self.allocation.parse().map_err(|_| {
            ConversionError::InvalidData(format!(
                "invalid allocation `{}` in time_slots.allocation",
                self.allocation
            ))
        })?;
        let slot = TimeSlot {
            time_slot_id,
            user_id: parse_uuid(&self.user_id, "time_slots.user_id")?,
            task_id: parse_uuid(&self.task_id, "time_slots.task_id")?,
            allocation,
            start_at: millis_to_instant(self.start_at, "time_slots.start_at")?,
            end_at: millis_to_instant(self.end_at, "time_slots.end_at")?,
            ext_data: decode_ext_data(self.ext_data.as_deref(), time_slot_id)?,
            provenance: self.provenance.into_domain()?,
        };
        slot.validate()
            .map_err(|err| ConversionError::InvalidData(format!("time_slots row: {err}")))?;
        Ok(slot)
    }

    pub fn created_at(&self) -> i64 {
        self.provenance.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.provenance.updated_at
    }

    pub fn created_by(&self) -> &str {
        &self.provenance.created_by
    }

    pub fn updated_by(&self) -> &str {
        &self.provenance.updated_by
    }
}
