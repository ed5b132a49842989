//! AlertActor - Serializes availability samples of one target
//!
//! Several report actors may feed the same target's alerter at their own cadence. The
//! alerter's "since" timestamp is only meaningful if samples are applied one after the
//! other, so the alerter lives inside this actor and every sample goes through its queue.
//!
//! ## Message Flow
//!
//! ```text
//! ReportActor-1 ─┐
//! ReportActor-2 ─┼─ Feed(sample) ─▶ AlertActor ─▶ AvailabilityAlerter::feed ─▶ Option<Alert>
//! ReportActor-N ─┘
//! ```

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::alerts::{Alert, AlertPolicy, AvailabilityAlerter, AvailabilitySample};

use super::messages::{AlertCommand, AlertStatus};

pub struct AlertActor {
    alerter: AvailabilityAlerter,
    command_rx: mpsc::Receiver<AlertCommand>,
    cancel: CancellationToken,
    url: String,
}

impl AlertActor {
    pub fn new(
        url: String,
        policy: AlertPolicy,
        command_rx: mpsc::Receiver<AlertCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            alerter: AvailabilityAlerter::new(policy),
            command_rx,
            cancel,
            url,
        }
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn run(mut self) {
        debug!("starting alert actor");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("cancelled");
                    break;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(AlertCommand::Feed { sample, respond_to }) => {
                            let alert = self.alerter.feed(sample);
                            if let Some(alert) = &alert {
                                warn!("{alert}");
                            }
                            let _ = respond_to.send(alert);
                        }

                        Some(AlertCommand::GetState { respond_to }) => {
                            let _ = respond_to.send(AlertStatus {
                                state: self.alerter.state(),
                                pending_recovery: self.alerter.pending_recovery(),
                            });
                        }

                        Some(AlertCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            debug!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("alert actor stopped");
    }
}

/// Handle for feeding samples to an AlertActor
#[derive(Clone)]
pub struct AlertHandle {
    sender: mpsc::Sender<AlertCommand>,
}

impl AlertHandle {
    /// Create the actor without starting it, for callers that manage their own tasks
    pub fn new(
        url: String,
        policy: AlertPolicy,
        cancel: CancellationToken,
    ) -> (Self, AlertActor) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = AlertActor::new(url, policy, cmd_rx, cancel);
        (Self { sender: cmd_tx }, actor)
    }

    pub fn spawn(url: String, policy: AlertPolicy, cancel: CancellationToken) -> Self {
        let (handle, actor) = Self::new(url, policy, cancel);
        tokio::spawn(actor.run());
        handle
    }

    pub async fn feed(&self, sample: AvailabilitySample) -> Result<Option<Alert>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AlertCommand::Feed {
                sample,
                respond_to: tx,
            })
            .await?;

        Ok(rx.await?)
    }

    pub async fn state(&self) -> Result<AlertStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AlertCommand::GetState { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(AlertCommand::Shutdown).await;
    }
}
