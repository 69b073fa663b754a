//! Scheduling validation engine.
//!
//! # Responsibility
//! - Decide whether a candidate slot may be committed against a read
//!   snapshot of the owner's calendar.
//!
//! # Invariants
//! - Pure: no I/O, no shared state. Callers must run the decision inside the
//!   same transaction as the write.
//! - Windows are half-open; back-to-back slots never conflict.

pub mod engine;

pub use engine::{
    check_task_ownership, evaluate, find_conflicts, windows_intersect, SchedulingError,
};
