//! ReportActor - Periodic statistics reports for one target
//!
//! One actor runs per report definition. Each tick reads a snapshot over the definition's
//! lookback, feeds its availability through the target's alert actor and hands the
//! result to the reporter.
//!
//! ```text
//! Timer tick → StatStore::snapshot(lookback) → AlertHandle::feed → Reporter::report
//! ```
//!
//! A snapshot without data is still reported, but never fed to the alerter.

use std::sync::Arc;

use anyhow::Result;
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace};

use crate::ReportEvent;
use crate::alerts::AvailabilitySample;
use crate::config::ReportDefinition;
use crate::reporter::Reporter;
use crate::stats::{Lookback, StatStore};
use crate::util::WallClock;

use super::alert::AlertHandle;
use super::messages::ReportCommand;

/// Everything a report actor reads from or writes to
#[derive(Clone)]
pub struct ReportContext {
    pub url: Url,
    pub store: StatStore,
    pub alerts: AlertHandle,
    pub reporter: Arc<dyn Reporter>,
    pub clock: WallClock,
}

pub struct ReportActor {
    definition: ReportDefinition,
    context: ReportContext,
    command_rx: mpsc::Receiver<ReportCommand>,
    cancel: CancellationToken,
}

impl ReportActor {
    pub fn new(
        definition: ReportDefinition,
        context: ReportContext,
        command_rx: mpsc::Receiver<ReportCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            definition,
            context,
            command_rx,
            cancel,
        }
    }

    #[instrument(skip(self), fields(url = %self.context.url, cadence = self.definition.cadence, lookback = self.definition.lookback))]
    pub async fn run(mut self) {
        debug!("starting report actor");

        // the first report is due one cadence after start, not immediately
        let cadence = self.definition.cadence();
        let mut ticker = interval_at(Instant::now() + cadence, cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    match self.report_or_cancel().await {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => error!("failed to report: {e:#}"),
                        None => {
                            debug!("cancelled during report");
                            break;
                        }
                    }
                }

                cmd = self.command_rx.recv(), if commands_open => {
                    match cmd {
                        Some(ReportCommand::ReportNow { respond_to }) => {
                            debug!("received ReportNow command");
                            match self.report_or_cancel().await {
                                Some(Ok(event)) => {
                                    let _ = respond_to.send(event);
                                }
                                Some(Err(e)) => error!("failed to report: {e:#}"),
                                None => break,
                            }
                        }

                        Some(ReportCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        // every handle is gone; keep reporting until cancelled
                        None => {
                            trace!("command channel closed");
                            commands_open = false;
                        }
                    }
                }
            }
        }

        debug!("report actor stopped");
    }

    /// Report, unless cancellation arrives first (a reporter may never return)
    async fn report_or_cancel(&self) -> Option<Result<ReportEvent>> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = self.report() => Some(result),
        }
    }

    async fn report(&self) -> Result<ReportEvent> {
        let ReportContext {
            url,
            store,
            alerts,
            reporter,
            clock,
        } = &self.context;

        let now = clock.now();
        let lookback = Lookback::from(self.definition.lookback());
        let snapshot = store.snapshot(now, lookback).await;

        let alert = match snapshot.availability {
            Some(availability) => {
                alerts
                    .feed(AvailabilitySample {
                        availability,
                        at: now,
                    })
                    .await?
            }
            None => {
                trace!("no observations in lookback, skipping alert evaluation");
                None
            }
        };

        let event = ReportEvent {
            url: url.clone(),
            snapshot,
            timestamp: now,
            lookback: lookback.resolve(store.retention()),
            alert,
        };

        reporter.report(&event).await;

        Ok(event)
    }
}

/// Handle for controlling a ReportActor
#[derive(Clone)]
pub struct ReportHandle {
    sender: mpsc::Sender<ReportCommand>,
    definition: ReportDefinition,
}

impl ReportHandle {
    /// Create the actor without starting it, for callers that manage their own tasks
    pub fn new(
        definition: ReportDefinition,
        context: ReportContext,
        cancel: CancellationToken,
    ) -> (Self, ReportActor) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = ReportActor::new(definition, context, cmd_rx, cancel);
        (
            Self {
                sender: cmd_tx,
                definition,
            },
            actor,
        )
    }

    pub fn spawn(
        definition: ReportDefinition,
        context: ReportContext,
        cancel: CancellationToken,
    ) -> Self {
        let (handle, actor) = Self::new(definition, context, cancel);
        tokio::spawn(actor.run());
        handle
    }

    pub async fn report_now(&self) -> Result<ReportEvent> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ReportCommand::ReportNow { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(ReportCommand::Shutdown).await;
    }

    pub fn definition(&self) -> ReportDefinition {
        self.definition
    }
}
