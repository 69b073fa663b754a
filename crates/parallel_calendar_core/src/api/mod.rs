//! Handler boundary.
//!
//! # Responsibility
//! - Accept transport DTOs plus the acting user id and return a status-coded
//!   envelope.
//! - Map every `RepoError` to a stable status and machine-readable code.
//!
//! # Invariants
//! - Handlers never panic and never return a bare error; failures are
//!   rendered as `ErrorBody`.
//! - Internal failures do not echo storage details to callers.

mod dto;
mod handlers;

pub use dto::{
    ListTimeSlotsRequest, PageRequest, ProvenanceDto, TaskDto, TaskRequest, TimeSlotDto,
    TimeSlotRequest, WindowDto,
};
pub use handlers::{TaskHandler, TimeSlotHandler};

use crate::repo::{ErrorKind, RepoError};
use serde::Serialize;
use uuid::Uuid;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;

/// Error payload returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    /// Ids of the slots a rejected write collides with.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicting_ids: Vec<Uuid>,
}

impl From<&RepoError> for ErrorBody {
    fn from(err: &RepoError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::Internal => "internal storage error".to_string(),
            _ => err.to_string(),
        };
        let conflicting_ids = match err {
            RepoError::SchedulingConflict { conflicting, .. } => conflicting.clone(),
            _ => Vec::new(),
        };
        Self {
            code: kind.code(),
            message,
            conflicting_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiBody<T> {
    Data(T),
    Error(ErrorBody),
}

/// Status-coded response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: ApiBody<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(status: u16, data: T) -> Self {
        Self {
            status,
            body: ApiBody::Data(data),
        }
    }

    pub fn failure(err: &RepoError) -> Self {
        Self {
            status: err.kind().status_code(),
            body: ApiBody::Error(ErrorBody::from(err)),
        }
    }

    pub(crate) fn from_result(status: u16, result: Result<T, RepoError>) -> Self {
        match result {
            Ok(data) => Self::success(status, data),
            Err(err) => Self::failure(&err),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn data(&self) -> Option<&T> {
        match &self.body {
            ApiBody::Data(data) => Some(data),
            ApiBody::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match &self.body {
            ApiBody::Data(_) => None,
            ApiBody::Error(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiResponse, ErrorBody};
    use crate::db::DbError;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn conflict_lists_ids_and_maps_to_409() {
        let ids = vec![Uuid::now_v7(), Uuid::now_v7()];
        let err = RepoError::SchedulingConflict {
            time_slot_id: Uuid::now_v7(),
            conflicting: ids.clone(),
        };
        let response = ApiResponse::<()>::failure(&err);
        assert_eq!(response.status, 409);
        let body = response.error().unwrap();
        assert_eq!(body.code, "scheduling_conflict");
        assert_eq!(body.conflicting_ids, ids);
    }

    #[test]
    fn internal_errors_hide_storage_details() {
        let err = RepoError::Db(DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 2,
        });
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, "internal");
        assert!(!body.message.contains('9'));
    }

    #[test]
    fn success_envelope_serializes_under_data() {
        let response = ApiResponse::success(200, "pong");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], 200);
        assert_eq!(value["body"]["data"], "pong");
    }
}
