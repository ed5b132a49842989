//! Windowed statistics over probe observations
//!
//! [`StatWindow`] holds the observations of one target and answers aggregate queries.
//! [`StatStore`] shares a window between the probe actor (the single writer) and any
//! number of report actors (readers).
//!
//! ## Consistency
//!
//! Every `record` takes the write lock for the whole append + evict step, so a reader
//! observes either the window before the write or the window after it, never a
//! partially appended observation or a half-finished eviction.

pub mod error;
pub mod window;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::{Observation, StatSnapshot};

pub use error::{StatsError, StatsResult};
pub use window::{Lookback, StatWindow};

/// Shared handle to the stat window of one target
#[derive(Debug, Clone)]
pub struct StatStore {
    window: Arc<RwLock<StatWindow>>,
    retention: Duration,
}

impl StatStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            window: Arc::new(RwLock::new(StatWindow::new(retention))),
            retention,
        }
    }

    pub async fn record(&self, observation: Observation) -> StatsResult<()> {
        self.window.write().await.record(observation)
    }

    pub async fn snapshot(&self, now: DateTime<Utc>, lookback: Lookback) -> StatSnapshot {
        self.window.read().await.snapshot_at(now, lookback)
    }

    /// Copy of the observations inside `lookback`, oldest first
    pub async fn observations(&self, now: DateTime<Utc>, lookback: Lookback) -> Vec<Observation> {
        self.window
            .read()
            .await
            .query_at(now, lookback)
            .copied()
            .collect()
    }

    /// Read access for callers that want to iterate lazily.
    ///
    /// The probe actor is blocked from writing for as long as the guard is held.
    pub async fn read(&self) -> RwLockReadGuard<'_, StatWindow> {
        self.window.read().await
    }

    pub async fn len(&self) -> usize {
        self.window.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.window.read().await.is_empty()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }
}
