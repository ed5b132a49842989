//! Message types for actor communication
//!
//! Every actor owns an mpsc command receiver; request/response commands carry a oneshot
//! sender for the reply.

use tokio::sync::oneshot;

use crate::alerts::{Alert, AlertState, AvailabilitySample};
use crate::{Observation, ReportEvent};

/// Commands that can be sent to a ProbeActor
#[derive(Debug)]
pub enum ProbeCommand {
    /// Probe immediately, bypassing the interval timer
    ///
    /// Used for testing and manual refresh operations.
    ProbeNow {
        respond_to: oneshot::Sender<Observation>,
    },

    /// Stop probing; an in-flight probe is abandoned
    Shutdown,
}

/// Commands that can be sent to a ReportActor
#[derive(Debug)]
pub enum ReportCommand {
    /// Build and publish a report immediately
    ReportNow {
        respond_to: oneshot::Sender<ReportEvent>,
    },

    Shutdown,
}

/// Commands that can be sent to the AlertActor of a target
#[derive(Debug)]
pub enum AlertCommand {
    /// Feed one availability sample through the alerter
    Feed {
        sample: AvailabilitySample,
        respond_to: oneshot::Sender<Option<Alert>>,
    },

    /// Current classification of the target (`None` before the first sample)
    GetState {
        respond_to: oneshot::Sender<AlertStatus>,
    },

    Shutdown,
}

/// Snapshot of an alerter, as returned by [`AlertCommand::GetState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertStatus {
    pub state: Option<AlertState>,
    pub pending_recovery: bool,
}
