//! Time-bounded window of probe observations
//!
//! The window keeps observations in arrival order inside a `VecDeque`. Writes append at
//! the tail and then drop everything at the head that fell out of the retention
//! horizon, so the window never holds more than one horizon worth of data.
//!
//! Queries are expressed as a [`Lookback`] relative to a caller-supplied `now`:
//!
//! ```text
//!  oldest                                              newest
//!  [o1] [o2] [o3] [o4] [o5] [o6] [o7] [o8] [o9] [o10]
//!                      |<-------- lookback -------->| now
//!  |<------------------ retention ----------------->|
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::trace;

use super::error::{StatsError, StatsResult};
use crate::{Observation, StatSnapshot};

/// How far into the past a query reaches.
///
/// Lookbacks are always non-negative seconds. Callers that think in "seconds ago" with a
/// negative sign, or in minutes, go through the constructors which normalize the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookback {
    /// The whole retention horizon of the window
    #[default]
    Retention,

    Seconds(u64),
}

impl Lookback {
    pub fn from_secs(secs: i64) -> Self {
        Lookback::Seconds(secs.unsigned_abs())
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Lookback::Seconds(minutes.unsigned_abs().saturating_mul(60))
    }

    /// Concrete duration, clamped to the retention horizon
    pub fn resolve(self, retention: Duration) -> Duration {
        match self {
            Lookback::Retention => retention,
            Lookback::Seconds(secs) => Duration::from_secs(secs).min(retention),
        }
    }
}

impl From<i64> for Lookback {
    fn from(secs: i64) -> Self {
        Lookback::from_secs(secs)
    }
}

impl From<Duration> for Lookback {
    fn from(duration: Duration) -> Self {
        Lookback::Seconds(duration.as_secs())
    }
}

#[derive(Debug, Clone)]
pub struct StatWindow {
    observations: VecDeque<Observation>,
    retention: Duration,
}

impl StatWindow {
    pub fn new(retention: Duration) -> Self {
        Self {
            observations: VecDeque::new(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Append an observation and evict everything older than the retention horizon.
    ///
    /// Age is measured against the appended observation, which is the newest one in the
    /// window. A rejected observation leaves the window untouched.
    pub fn record(&mut self, observation: Observation) -> StatsResult<()> {
        if let Some(code) = observation.status_code
            && !(100..=599).contains(&code)
        {
            return Err(StatsError::MalformedObservation(format!(
                "status code {code} is not a valid HTTP status"
            )));
        }

        if let Some(tail) = self.observations.back()
            && observation.timestamp < tail.timestamp
        {
            return Err(StatsError::OutOfOrder {
                previous: tail.timestamp,
                received: observation.timestamp,
            });
        }

        self.observations.push_back(observation);

        let evicted = self.evict(observation.timestamp);
        if evicted > 0 {
            trace!("evicted {evicted} observations, {} retained", self.len());
        }

        Ok(())
    }

    fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        while let Some(head) = self.observations.front() {
            if age(now, head.timestamp) <= self.retention {
                break;
            }
            self.observations.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Observations no older than `lookback` at `now`, oldest first.
    ///
    /// The iterator borrows the window, so it cannot outlive the lock guard it was
    /// obtained through.
    pub fn query_at(
        &self,
        now: DateTime<Utc>,
        lookback: Lookback,
    ) -> impl Iterator<Item = &Observation> + '_ {
        let lookback = lookback.resolve(self.retention);
        self.observations
            .iter()
            .filter(move |observation| age(now, observation.timestamp) <= lookback)
    }

    pub fn availability_at(&self, now: DateTime<Utc>, lookback: Lookback) -> Option<f64> {
        let (successes, total) = self
            .query_at(now, lookback)
            .fold((0usize, 0usize), |(successes, total), observation| {
                (successes + observation.is_success() as usize, total + 1)
            });

        if total == 0 {
            return None;
        }

        Some(successes as f64 / total as f64)
    }

    pub fn avg_latency_at(&self, now: DateTime<Utc>, lookback: Lookback) -> Option<Duration> {
        let (sum, count) = self
            .query_at(now, lookback)
            .fold((Duration::ZERO, 0u32), |(sum, count), observation| {
                (sum + observation.latency, count + 1)
            });

        if count == 0 {
            return None;
        }

        Some(sum / count)
    }

    pub fn max_latency_at(&self, now: DateTime<Utc>, lookback: Lookback) -> Option<Duration> {
        self.query_at(now, lookback)
            .map(|observation| observation.latency)
            .max()
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>, lookback: Lookback) -> StatSnapshot {
        StatSnapshot {
            availability: self.availability_at(now, lookback),
            avg_latency: self.avg_latency_at(now, lookback),
            max_latency: self.max_latency_at(now, lookback),
        }
    }
}

/// Age of `timestamp` seen from `now`; timestamps ahead of `now` have age zero.
fn age(now: DateTime<Utc>, timestamp: DateTime<Utc>) -> Duration {
    (now - timestamp).to_std().unwrap_or(Duration::ZERO)
}
