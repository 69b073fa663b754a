//! Transport shapes. Identifiers travel as UUID strings, instants as
//! RFC 3339 UTC.

use crate::model::{Allocation, ExtData, Provenance, Task, TimeSlot, TimeWindow, ValidationError};
use crate::service::{NewTask, NewTimeSlot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Created/updated stamps as rendered to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceDto {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

impl From<Provenance> for ProvenanceDto {
    fn from(value: Provenance) -> Self {
        Self {
            created_at: value.created_at,
            updated_at: value.updated_at,
            created_by: value.created_by,
            updated_by: value.updated_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDto {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// `null` and `""` are distinct values.
    pub description: Option<String>,
    #[serde(flatten)]
    pub provenance: ProvenanceDto,
}

impl From<Task> for TaskDto {
    fn from(value: Task) -> Self {
        Self {
            task_id: value.task_id,
            user_id: value.user_id,
            title: value.title,
            description: value.description,
            provenance: value.provenance.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlotDto {
    pub time_slot_id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub allocation: Allocation,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// `null` and `{}` are distinct values.
    pub ext_data: Option<ExtData>,
    #[serde(flatten)]
    pub provenance: ProvenanceDto,
}

impl From<TimeSlot> for TimeSlotDto {
    fn from(value: TimeSlot) -> Self {
        Self {
            time_slot_id: value.time_slot_id,
            user_id: value.user_id,
            task_id: value.task_id,
            allocation: value.allocation,
            start_at: value.start_at,
            end_at: value.end_at,
            ext_data: value.ext_data,
            provenance: value.provenance.into(),
        }
    }
}

/// Body of task create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<TaskRequest> for NewTask {
    fn from(value: TaskRequest) -> Self {
        Self {
            title: value.title,
            description: value.description,
        }
    }
}

/// Body of time slot create and update requests.
///
/// `allocation` stays a plain string here so an unknown label is reported
/// as a validation failure rather than a decoding failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlotRequest {
    pub task_id: Uuid,
    pub allocation: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub ext_data: Option<ExtData>,
}

impl TryFrom<TimeSlotRequest> for NewTimeSlot {
    type Error = ValidationError;

    fn try_from(value: TimeSlotRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            task_id: value.task_id,
            allocation: value.allocation.parse()?,
            start_at: value.start_at,
            end_at: value.end_at,
            ext_data: value.ext_data,
        })
    }
}

/// Query half-open window `[start_at, end_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDto {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl TryFrom<WindowDto> for TimeWindow {
    type Error = ValidationError;

    fn try_from(value: WindowDto) -> Result<Self, Self::Error> {
        TimeWindow::try_new(value.start_at, value.end_at)
    }
}

/// Pagination shared by list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTimeSlotsRequest {
    #[serde(default)]
    pub window: Option<WindowDto>,
    #[serde(flatten)]
    pub page: PageRequest,
}
