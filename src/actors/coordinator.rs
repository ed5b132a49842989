//! MonitorCoordinator - Owns and supervises everything belonging to one target
//!
//! ```text
//!                       MonitorCoordinator (one per target)
//!                                   │ spawns on a TaskTracker
//!          ┌────────────────────────┼─────────────────────────┐
//!          │                        │                         │
//!   ┌──────▼──────┐          ┌──────▼──────┐           ┌──────▼──────┐
//!   │ ProbeActor  │ record   │  StatStore  │ snapshot  │ ReportActor │ × N
//!   │  (writer)   ├─────────▶│  (RwLock)   │◀──────────┤  (readers)  │
//!   └─────────────┘          └─────────────┘           └──────┬──────┘
//!                                                             │ feed
//!                                                      ┌──────▼──────┐
//!                                                      │ AlertActor  │
//!                                                      └─────────────┘
//! ```
//!
//! Targets share nothing with each other. All actors of a target stop when the
//! coordinator's cancellation token (a child of the process-wide token) is cancelled.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument};

use crate::config::ResolvedTargetConfig;
use crate::http::HttpClient;
use crate::reporter::Reporter;
use crate::stats::StatStore;
use crate::util::WallClock;

use super::alert::AlertHandle;
use super::probe::ProbeHandle;
use super::report::{ReportContext, ReportHandle};

pub struct MonitorCoordinator {
    target: ResolvedTargetConfig,
    client: Arc<dyn HttpClient>,
    reporter: Arc<dyn Reporter>,
    clock: WallClock,
}

impl MonitorCoordinator {
    pub fn new(
        target: ResolvedTargetConfig,
        client: Arc<dyn HttpClient>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            target,
            client,
            reporter,
            clock: WallClock::new(),
        }
    }

    pub fn with_clock(mut self, clock: WallClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn target(&self) -> &ResolvedTargetConfig {
        &self.target
    }

    /// Start every actor of the target and return immediately
    pub fn spawn(self, parent: &CancellationToken) -> CoordinatorHandle {
        let cancel = parent.child_token();
        let tracker = TaskTracker::new();
        let url = self.target.url.clone();

        debug!(
            "starting monitor for {url}: probe every {:?}, {} reports, retention {:?}",
            self.target.interval,
            self.target.reports.len(),
            self.target.retention
        );

        let store = StatStore::new(self.target.retention);

        let (alerts, alert_actor) =
            AlertHandle::new(url.to_string(), self.target.alert, cancel.clone());
        tracker.spawn(alert_actor.run());

        let (probe, probe_actor) = ProbeHandle::new(
            url.clone(),
            self.target.interval,
            self.client,
            store.clone(),
            self.clock,
            cancel.clone(),
        );
        tracker.spawn(probe_actor.run());

        let context = ReportContext {
            url,
            store: store.clone(),
            alerts: alerts.clone(),
            reporter: self.reporter,
            clock: self.clock,
        };
        let reports = self
            .target
            .reports
            .iter()
            .map(|definition| {
                let (handle, actor) =
                    ReportHandle::new(*definition, context.clone(), cancel.clone());
                tracker.spawn(actor.run());
                handle
            })
            .collect();

        // no more tasks will be added; wait() completes once all of them stopped
        tracker.close();

        CoordinatorHandle {
            store,
            probe,
            reports,
            alerts,
            cancel,
            tracker,
        }
    }

    /// Monitor the target until `cancel` fires, then wait for every actor to stop
    #[instrument(skip_all, fields(url = %self.target.url))]
    pub async fn run(self, cancel: CancellationToken) {
        let handle = self.spawn(&cancel);
        cancel.cancelled().await;
        handle.wait().await;
        debug!("monitor stopped");
    }
}

/// Access to the running actors of one target
///
/// Dropping the handle does not stop anything; the actors run until the coordinator's
/// token (or its parent) is cancelled.
pub struct CoordinatorHandle {
    store: StatStore,
    probe: ProbeHandle,
    reports: Vec<ReportHandle>,
    alerts: AlertHandle,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl CoordinatorHandle {
    pub fn store(&self) -> &StatStore {
        &self.store
    }

    pub fn probe(&self) -> &ProbeHandle {
        &self.probe
    }

    pub fn reports(&self) -> &[ReportHandle] {
        &self.reports
    }

    pub fn alerts(&self) -> &AlertHandle {
        &self.alerts
    }

    /// Number of actors still running
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every actor has stopped (after cancellation)
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Stop this target only; other targets keep running
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.tracker.wait().await;
    }
}

/// Run every coordinator until `cancel` fires
pub async fn run_all(coordinators: Vec<MonitorCoordinator>, cancel: CancellationToken) {
    info!("monitoring {} targets", coordinators.len());

    join_all(
        coordinators
            .into_iter()
            .map(|coordinator| coordinator.run(cancel.clone())),
    )
    .await;

    info!("all monitors stopped");
}
