//! Half-open time windows and instant normalization.

use super::validation::ValidationError;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Truncates an instant to millisecond precision.
///
/// Storage keeps epoch milliseconds, so every instant entering the domain is
/// truncated here to make persisted and in-memory values compare equal.
pub fn normalize_instant(value: DateTime<Utc>) -> DateTime<Utc> {
    value
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(value)
}

/// A `[start, end)` window. The end instant is excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Builds a normalized window.
    ///
    /// # Errors
    /// - `InvalidTimeRange` when `start >= end` after normalization.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        let start = normalize_instant(start);
        let end = normalize_instant(end);
        if start >= end {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open intersection test; windows that only touch do not intersect.
    pub fn intersects(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}
