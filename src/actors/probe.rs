//! ProbeActor - Probes one target and records observations
//!
//! ## Key Features
//!
//! 1. **Fixed cadence** - One probe per check interval, first one immediately
//! 2. **No probe timeout** - A slow target is waited for; overdue ticks are skipped
//! 3. **Failures are data** - Transport errors become failed observations
//! 4. **Sole writer** - The only task that calls `StatStore::record` for its target
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → HTTP GET → Observation → StatStore::record
//!     ↑
//!     └─── Commands (ProbeNow, Shutdown) / cancellation
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

use crate::Observation;
use crate::http::HttpClient;
use crate::stats::StatStore;
use crate::util::WallClock;

use super::messages::ProbeCommand;

pub struct ProbeActor {
    url: Url,
    client: Arc<dyn HttpClient>,
    store: StatStore,
    clock: WallClock,
    command_rx: mpsc::Receiver<ProbeCommand>,
    cancel: CancellationToken,
    interval_duration: Duration,
}

impl ProbeActor {
    pub fn new(
        url: Url,
        interval_duration: Duration,
        client: Arc<dyn HttpClient>,
        store: StatStore,
        clock: WallClock,
        command_rx: mpsc::Receiver<ProbeCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            url,
            client,
            store,
            clock,
            command_rx,
            cancel,
            interval_duration,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until the cancellation token fires or a Shutdown command is received.
    /// Dropping every handle only disables commands; probing goes on.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn run(mut self) {
        debug!("starting probe actor every {:?}", self.interval_duration);

        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    if self.probe_or_cancel().await.is_none() {
                        debug!("cancelled during probe");
                        break;
                    }
                }

                cmd = self.command_rx.recv(), if commands_open => {
                    match cmd {
                        Some(ProbeCommand::ProbeNow { respond_to }) => {
                            debug!("received ProbeNow command");
                            match self.probe_or_cancel().await {
                                Some(observation) => {
                                    let _ = respond_to.send(observation);
                                }
                                None => break,
                            }
                        }

                        Some(ProbeCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        // every handle is gone; keep probing until cancelled
                        None => {
                            trace!("command channel closed");
                            commands_open = false;
                        }
                    }
                }
            }
        }

        debug!("probe actor stopped");
    }

    /// Probe and record, unless cancellation arrives while the request is in flight
    async fn probe_or_cancel(&self) -> Option<Observation> {
        let observation = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            observation = self.probe() => observation,
        };

        // the record itself is not raced against cancellation
        if let Err(e) = self.store.record(observation).await {
            error!("observation rejected by stat store: {e}");
        }

        Some(observation)
    }

    async fn probe(&self) -> Observation {
        trace!("probing {}", self.url);

        match self.client.fetch(&self.url).await {
            Ok(response) => {
                trace!(
                    "{} answered {} in {:?}",
                    self.url, response.status_code, response.elapsed
                );
                Observation::new(self.clock.now(), response.status_code, response.elapsed)
            }
            Err(e) => {
                warn!("probe failed: {e}");
                Observation::failed(self.clock.now(), e.elapsed())
            }
        }
    }
}

/// Handle for controlling a ProbeActor
#[derive(Clone)]
pub struct ProbeHandle {
    sender: mpsc::Sender<ProbeCommand>,
    url: Url,
}

impl ProbeHandle {
    /// Create the actor without starting it, for callers that manage their own tasks
    pub fn new(
        url: Url,
        interval: Duration,
        client: Arc<dyn HttpClient>,
        store: StatStore,
        clock: WallClock,
        cancel: CancellationToken,
    ) -> (Self, ProbeActor) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = ProbeActor::new(url.clone(), interval, client, store, clock, cmd_rx, cancel);
        (
            Self {
                sender: cmd_tx,
                url,
            },
            actor,
        )
    }

    pub fn spawn(
        url: Url,
        interval: Duration,
        client: Arc<dyn HttpClient>,
        store: StatStore,
        clock: WallClock,
        cancel: CancellationToken,
    ) -> Self {
        let (handle, actor) = Self::new(url, interval, client, store, clock, cancel);
        tokio::spawn(actor.run());
        handle
    }

    /// Trigger an immediate probe and return what was recorded
    pub async fn probe_now(&self) -> Result<Observation> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ProbeCommand::ProbeNow { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(ProbeCommand::Shutdown).await;
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

// ============================================================================
// Tests
// ============================================================================
