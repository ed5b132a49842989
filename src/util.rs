use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;
use tracing::level_filters::LevelFilter;

const WEBMON_LOG: &str = "WEBMON_LOG";

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::DEBUG;

pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(WEBMON_LOG);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| {
        res.parse().unwrap_or(DEFAULT_LOG_LEVEL)
    })
}

/// Wall-clock timestamps that never run backwards.
///
/// The UTC time is read once at construction; afterwards time advances with tokio's
/// monotonic clock. Observations stamped with it are therefore always in order, and tests
/// running on paused tokio time get timestamps that follow the virtual clock.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    anchor_utc: DateTime<Utc>,
    anchor_instant: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(anchor_utc: DateTime<Utc>) -> Self {
        Self {
            anchor_utc,
            anchor_instant: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.anchor_instant.elapsed())
            .ok()
            .and_then(|elapsed| self.anchor_utc.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}
