//! Core domain logic for the parallel calendar.
//! This crate is the single source of truth for scheduling invariants.

pub mod api;
pub mod cancel;
pub mod config;
pub mod convert;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scheduling;
pub mod service;

pub use api::{ApiResponse, ErrorBody, TaskHandler, TimeSlotHandler};
pub use cancel::CancellationToken;
pub use config::{ConfigError, CoreConfig};
pub use db::{CalendarStore, DbError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::{
    Allocation, ExtData, Task, TaskId, TimeSlot, TimeSlotId, TimeWindow, User, UserId,
    ValidationError,
};
pub use repo::{
    EntityKind, ErrorKind, RepoError, RepoResult, SqliteTaskRepository,
    SqliteTimeSlotRepository, SqliteUserRepository, TaskListQuery, TaskRepository,
    TimeSlotListQuery, TimeSlotRepository, UserRepository,
};
pub use scheduling::SchedulingError;
pub use service::{CalendarService, SqliteCalendarService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
