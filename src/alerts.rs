//! Hysteresis-debounced availability alerts
//!
//! ## State Machine
//!
//! Every availability sample is classified against the policy threshold. The alerter
//! remembers since when the current classification holds and whether a down alert is
//! still waiting for its recovery:
//!
//! ```text
//! (no sample yet) ──first sample──▶ Available | Unavailable   (no alert)
//!
//! Unavailable for > hysteresis, nothing pending  → SiteDown, pending = true
//! Available   for > hysteresis, pending          → SiteBack, pending = false
//! anything else                                  → no alert
//! ```
//!
//! A classification change resets the "since" timestamp, so flapping around the threshold
//! never raises an alert.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

pub const DEFAULT_THRESHOLD: f64 = 0.8;

pub const DEFAULT_HYSTERESIS: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    /// Minimum availability fraction that still counts as available
    pub threshold: f64,

    /// How long a classification must hold before it may raise an alert
    pub hysteresis: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            hysteresis: DEFAULT_HYSTERESIS,
        }
    }
}

impl AlertPolicy {
    pub fn classify(&self, availability: f64) -> Classification {
        if availability >= self.threshold {
            Classification::Available
        } else {
            Classification::Unavailable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertState {
    pub classification: Classification,

    /// Time of the sample that entered the current classification
    pub since: DateTime<Utc>,
}

/// One availability fraction, taken at `at`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvailabilitySample {
    pub availability: f64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    SiteDown,
    SiteBack,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,

    /// Availability of the sample that raised the alert
    pub availability: f64,

    pub at: DateTime<Utc>,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.kind {
            AlertKind::SiteDown => "down",
            AlertKind::SiteBack => "back",
        };
        write!(
            f,
            "Site is {state}. availability={:.0}%, time={}",
            self.availability * 100.0,
            self.at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Availability alert state of one target.
///
/// Created once per target and fed every sample of its lifetime in order; the "since"
/// timestamp and the pending flag only mean something across that whole history.
#[derive(Debug, Clone)]
pub struct AvailabilityAlerter {
    policy: AlertPolicy,
    state: Option<AlertState>,
    pending_recovery: bool,
}

impl AvailabilityAlerter {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            state: None,
            pending_recovery: false,
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    pub fn state(&self) -> Option<AlertState> {
        self.state
    }

    /// Whether a down alert went out that has not been followed by a recovery yet
    pub fn pending_recovery(&self) -> bool {
        self.pending_recovery
    }

    pub fn feed(&mut self, sample: AvailabilitySample) -> Option<Alert> {
        let classification = self.policy.classify(sample.availability);

        let state = match self.state {
            Some(state) if state.classification == classification => state,
            previous => {
                trace!(
                    "classification {:?} -> {classification:?} at {}",
                    previous.map(|s| s.classification),
                    sample.at
                );
                AlertState {
                    classification,
                    since: sample.at,
                }
            }
        };
        self.state = Some(state);

        let held_long_enough = (sample.at - state.since)
            .to_std()
            .is_ok_and(|held| held > self.policy.hysteresis);
        if !held_long_enough {
            return None;
        }

        let kind = match (classification, self.pending_recovery) {
            (Classification::Unavailable, false) => AlertKind::SiteDown,
            (Classification::Available, true) => AlertKind::SiteBack,
            _ => return None,
        };

        self.pending_recovery = kind == AlertKind::SiteDown;
        debug!("raising {kind:?} at availability {}", sample.availability);

        Some(Alert {
            kind,
            availability: sample.availability,
            at: sample.at,
        })
    }
}
