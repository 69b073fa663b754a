//! Task and time slot handlers.
//!
//! Each call checks out one pooled connection, builds the SQLite-backed
//! service on it and releases the connection on return. The store checked
//! the schema when it opened, so calls skip per-connection introspection.

use super::dto::{
    ListTimeSlotsRequest, PageRequest, TaskDto, TaskRequest, TimeSlotDto, TimeSlotRequest,
};
use super::{ApiResponse, STATUS_CREATED, STATUS_NO_CONTENT, STATUS_OK};
use crate::cancel::CancellationToken;
use crate::db::CalendarStore;
use crate::model::{TaskId, TimeSlotId, TimeWindow, UserId};
use crate::repo::{RepoError, RepoResult};
use crate::service::{NewTimeSlot, SqliteCalendarService};

fn with_service<R>(
    store: &CalendarStore,
    cancellation: Option<CancellationToken>,
    f: impl FnOnce(&SqliteCalendarService<'_>) -> RepoResult<R>,
) -> RepoResult<R> {
    let conn = store.connection()?;
    f(&SqliteCalendarService::on_store(&conn, cancellation))
}

/// Task endpoints.
#[derive(Clone)]
pub struct TaskHandler {
    store: CalendarStore,
}

impl TaskHandler {
    pub fn new(store: CalendarStore) -> Self {
        Self { store }
    }

    pub fn create(&self, actor: UserId, request: TaskRequest) -> ApiResponse<TaskDto> {
        let result = with_service(&self.store, None, |service| {
            service.create_task(actor, request.into())
        });
        ApiResponse::from_result(STATUS_CREATED, result.map(TaskDto::from))
    }

    pub fn get(&self, actor: UserId, id: TaskId) -> ApiResponse<TaskDto> {
        let result = with_service(&self.store, None, |service| service.get_task(actor, id));
        ApiResponse::from_result(STATUS_OK, result.map(TaskDto::from))
    }

    pub fn list(&self, actor: UserId, page: PageRequest) -> ApiResponse<Vec<TaskDto>> {
        let result = with_service(&self.store, None, |service| {
            service.list_tasks(actor, page.limit, page.offset)
        });
        ApiResponse::from_result(
            STATUS_OK,
            result.map(|tasks| tasks.into_iter().map(TaskDto::from).collect()),
        )
    }

    pub fn update(&self, actor: UserId, id: TaskId, request: TaskRequest) -> ApiResponse<TaskDto> {
        let result = with_service(&self.store, None, |service| {
            service.update_task(actor, id, request.into())
        });
        ApiResponse::from_result(STATUS_OK, result.map(TaskDto::from))
    }

    pub fn delete(&self, actor: UserId, id: TaskId) -> ApiResponse<()> {
        let result = with_service(&self.store, None, |service| service.delete_task(actor, id));
        ApiResponse::from_result(STATUS_NO_CONTENT, result)
    }
}

/// Time slot endpoints. Writes accept an optional cancellation token.
#[derive(Clone)]
pub struct TimeSlotHandler {
    store: CalendarStore,
}

impl TimeSlotHandler {
    pub fn new(store: CalendarStore) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        actor: UserId,
        request: TimeSlotRequest,
        cancellation: Option<CancellationToken>,
    ) -> ApiResponse<TimeSlotDto> {
        let result = NewTimeSlot::try_from(request)
            .map_err(RepoError::from)
            .and_then(|input| {
                with_service(&self.store, cancellation, |service| {
                    service.schedule(actor, input)
                })
            });
        ApiResponse::from_result(STATUS_CREATED, result.map(TimeSlotDto::from))
    }

    pub fn get(&self, actor: UserId, id: TimeSlotId) -> ApiResponse<TimeSlotDto> {
        let result = with_service(&self.store, None, |service| {
            service.get_time_slot(actor, id)
        });
        ApiResponse::from_result(STATUS_OK, result.map(TimeSlotDto::from))
    }

    pub fn list(
        &self,
        actor: UserId,
        request: ListTimeSlotsRequest,
    ) -> ApiResponse<Vec<TimeSlotDto>> {
        let result = request
            .window
            .map(TimeWindow::try_from)
            .transpose()
            .map_err(RepoError::from)
            .and_then(|window| {
                with_service(&self.store, None, |service| {
                    service.list_time_slots(
                        actor,
                        window,
                        request.page.limit,
                        request.page.offset,
                    )
                })
            });
        ApiResponse::from_result(
            STATUS_OK,
            result.map(|slots| slots.into_iter().map(TimeSlotDto::from).collect()),
        )
    }

    pub fn update(
        &self,
        actor: UserId,
        id: TimeSlotId,
        request: TimeSlotRequest,
        cancellation: Option<CancellationToken>,
    ) -> ApiResponse<TimeSlotDto> {
        let result = NewTimeSlot::try_from(request)
            .map_err(RepoError::from)
            .and_then(|changes| {
                with_service(&self.store, cancellation, |service| {
                    service.reschedule(actor, id, changes)
                })
            });
        ApiResponse::from_result(STATUS_OK, result.map(TimeSlotDto::from))
    }

    pub fn delete(&self, actor: UserId, id: TimeSlotId) -> ApiResponse<()> {
        let result = with_service(&self.store, None, |service| {
            service.delete_time_slot(actor, id)
        });
        ApiResponse::from_result(STATUS_NO_CONTENT, result)
    }
}
