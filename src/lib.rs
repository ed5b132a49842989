pub mod actors;
pub mod alerts;
pub mod config;
pub mod http;
pub mod reporter;
pub mod stats;
pub mod util;

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Url;

use crate::alerts::Alert;

/// Result of a single probe against a target.
///
/// `status_code` is `None` when the request never produced a response (DNS failure,
/// connection refused, reset, ...). Such observations always count as unsuccessful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub latency: Duration,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, status_code: u16, latency: Duration) -> Self {
        Self {
            timestamp,
            status_code: Some(status_code),
            latency,
        }
    }

    /// Observation for a probe that failed before a response arrived.
    pub fn failed(timestamp: DateTime<Utc>, latency: Duration) -> Self {
        Self {
            timestamp,
            status_code: None,
            latency,
        }
    }

    /// Any 2xx status is a success
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..300).contains(&code))
    }
}

/// Aggregates over one lookback window.
///
/// Every field is `None` when the window held no observations. A present value of
/// zero (e.g. 0% availability) is a real measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatSnapshot {
    pub availability: Option<f64>,
    pub avg_latency: Option<Duration>,
    pub max_latency: Option<Duration>,
}

impl StatSnapshot {
    pub fn is_empty(&self) -> bool {
        self.availability.is_none()
    }
}

/// Everything a reporter gets to see for one report tick
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEvent {
    pub url: Url,
    pub snapshot: StatSnapshot,
    pub timestamp: DateTime<Utc>,
    pub lookback: Duration,
    pub alert: Option<Alert>,
}
