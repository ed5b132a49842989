//! Error types for stat window operations

use std::fmt;

use chrono::{DateTime, Utc};

/// Result type alias for stat window operations
pub type StatsResult<T> = Result<T, StatsError>;

/// Errors raised at the stat window boundary
///
/// Both variants point at a defect in the caller: the probe scheduler only ever
/// produces well-formed observations from a monotonic clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// The observation carries values that can never come from a real probe
    MalformedObservation(String),

    /// The observation is older than the newest one already in the window
    OutOfOrder {
        previous: DateTime<Utc>,
        received: DateTime<Utc>,
    },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::MalformedObservation(msg) => write!(f, "malformed observation: {}", msg),
            StatsError::OutOfOrder { previous, received } => write!(
                f,
                "observation at {} is older than the window tail at {}",
                received, previous
            ),
        }
    }
}

impl std::error::Error for StatsError {}
