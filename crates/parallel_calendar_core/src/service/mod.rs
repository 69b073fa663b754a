//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Stamp fresh ids, timestamps and provenance before dispatch.
//! - Keep the handler boundary decoupled from storage details.

pub mod calendar_service;

pub use calendar_service::{
    CalendarService, NewTask, NewTimeSlot, SqliteCalendarService, TaskChanges, TimeSlotChanges,
};
