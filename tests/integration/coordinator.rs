//! Whole-target monitoring on paused time
//!
//! These tests verify that the coordinator wires probe, reports and alerts together:
//! - A site going down and coming back yields one alert each
//! - Targets are independent of each other
//! - Cancellation stops every task, and only cancellation does
//! - Several reports feeding one alerter keep its state consistent

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use website_monitoring::ReportEvent;
use website_monitoring::actors::coordinator::{MonitorCoordinator, run_all};
use website_monitoring::alerts::{AlertKind, Classification};
use website_monitoring::config::ReportDefinition;
use website_monitoring::reporter::BroadcastReporter;

use crate::helpers::*;

async fn collect_alerts(
    events: &mut broadcast::Receiver<ReportEvent>,
    url: &str,
    reports: usize,
) -> Vec<AlertKind> {
    let mut alerts = vec![];
    for _ in 0..reports {
        let event = events.recv().await.unwrap();
        if event.url.as_str() != url {
            continue;
        }
        if let Some(alert) = event.alert {
            alerts.push(alert.kind);
        }
    }
    alerts
}

#[tokio::test(start_paused = true)]
async fn test_site_down_and_back_alerts_once_each() {
    let site = SwitchableSite::down();
    let reporter = Arc::new(BroadcastReporter::new(256));
    let mut events = reporter.subscribe();
    let root = CancellationToken::new();

    let target = create_test_target("http://down.example.com");
    let handle = MonitorCoordinator::new(target, site.clone(), reporter).spawn(&root);

    // wait for the down alert
    let mut down_seen = false;
    for _ in 0..20 {
        let event = events.recv().await.unwrap();
        if let Some(alert) = event.alert {
            assert_eq!(alert.kind, AlertKind::SiteDown);
            assert!(alert.availability < 0.8);
            down_seen = true;
            break;
        }
    }
    assert!(down_seen, "site down alert should be raised");

    site.set_down(false);

    let mut after_recovery = vec![];
    for _ in 0..20 {
        let event = events.recv().await.unwrap();
        if let Some(alert) = event.alert {
            after_recovery.push(alert.kind);
            if alert.kind == AlertKind::SiteBack {
                assert!(alert.availability >= 0.8);
                break;
            }
        }
    }
    assert_eq!(after_recovery, vec![AlertKind::SiteBack]);

    // healthy from here on: no more alerts
    let later = collect_alerts(&mut events, "http://down.example.com/", 10).await;
    assert!(later.is_empty());

    let status = handle.alerts().state().await.unwrap();
    assert!(!status.pending_recovery);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_targets_are_independent() {
    let reporter = Arc::new(BroadcastReporter::new(256));
    let mut events = reporter.subscribe();
    let root = CancellationToken::new();

    let healthy = MonitorCoordinator::new(
        create_test_target("http://healthy.example.com"),
        SwitchableSite::up(),
        reporter.clone(),
    )
    .spawn(&root);
    let broken = MonitorCoordinator::new(
        create_test_target("http://broken.example.com"),
        SwitchableSite::down(),
        reporter,
    )
    .spawn(&root);

    // ten reports each: 100s of monitoring
    let mut healthy_alerts = vec![];
    let mut broken_alerts = vec![];
    for _ in 0..20 {
        let event = events.recv().await.unwrap();
        let (alerts, expected_availability) =
            if event.url.host_str() == Some("healthy.example.com") {
                (&mut healthy_alerts, 1.0)
            } else {
                (&mut broken_alerts, 0.0)
            };
        assert_eq!(event.snapshot.availability, Some(expected_availability));
        if let Some(alert) = event.alert {
            alerts.push(alert.kind);
        }
    }

    assert!(healthy_alerts.is_empty());
    assert_eq!(broken_alerts, vec![AlertKind::SiteDown]);
    assert!(!healthy.store().is_empty().await);

    root.cancel();
    healthy.wait().await;
    broken.wait().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_every_task() {
    let site = SwitchableSite::up();
    let reporter = Arc::new(BroadcastReporter::new(256));
    let root = CancellationToken::new();

    let handle = MonitorCoordinator::new(
        create_test_target("http://example.com"),
        site.clone(),
        reporter,
    )
    .spawn(&root);

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert!(site.calls() >= 5);

    root.cancel();
    handle.wait().await;
    assert_eq!(handle.running(), 0);

    let calls = site.calls();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(site.calls(), calls);
    assert!(handle.probe().probe_now().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_run_all_returns_after_cancellation() {
    let reporter = Arc::new(BroadcastReporter::new(256));
    let root = CancellationToken::new();

    let coordinators = vec![
        MonitorCoordinator::new(
            create_test_target("http://one.example.com"),
            SwitchableSite::up(),
            reporter.clone(),
        ),
        MonitorCoordinator::new(
            create_test_target("http://two.example.com"),
            SwitchableSite::down(),
            reporter,
        ),
    ];

    let task = tokio::spawn(run_all(coordinators, root.clone()));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(!task.is_finished());

    root.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("monitors should stop promptly")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_keeps_target_monitored() {
    let site = SwitchableSite::up();
    let reporter = Arc::new(BroadcastReporter::new(256));
    let mut events = reporter.subscribe();
    let root = CancellationToken::new();

    drop(
        MonitorCoordinator::new(
            create_test_target("http://example.com"),
            site.clone(),
            reporter,
        )
        .spawn(&root),
    );

    tokio::time::sleep(Duration::from_millis(30_500)).await;

    // one probe per second, first one immediately
    assert_eq!(site.calls(), 31);
    // reports at 10, 20 and 30s
    for _ in 0..3 {
        let event = events.recv().await.unwrap();
        assert_eq!(event.snapshot.availability, Some(1.0));
    }

    root.cancel();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(site.calls(), 31);
}

#[tokio::test(start_paused = true)]
async fn test_reports_share_one_alert_state() {
    let site = SwitchableSite::down();
    let reporter = Arc::new(BroadcastReporter::new(256));
    let mut events = reporter.subscribe();
    let root = CancellationToken::new();

    let mut target = create_test_target("http://down.example.com");
    target.reports = vec![
        ReportDefinition {
            cadence: 10,
            lookback: 30,
        },
        ReportDefinition {
            cadence: 15,
            lookback: 20,
        },
    ];
    let handle = MonitorCoordinator::new(target, site, reporter).spawn(&root);

    // up to 120s: twelve reports every 10s and eight every 15s, colliding at 30, 60, 90, 120
    let mut fed = vec![];
    let mut alerts = vec![];
    for _ in 0..20 {
        let event = events.recv().await.unwrap();
        fed.push((event.timestamp, event.lookback.as_secs()));
        if let Some(alert) = event.alert {
            alerts.push((alert.kind, event.lookback.as_secs()));
        }
    }

    let kinds: Vec<_> = alerts.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(kinds, vec![AlertKind::SiteDown]);
    assert!(fed.iter().any(|(_, lookback)| *lookback == 30));
    assert!(fed.iter().any(|(_, lookback)| *lookback == 20));

    // the first sample of either stream opened the unavailable period
    let first_sample = fed.iter().map(|(timestamp, _)| *timestamp).min().unwrap();
    let status = handle.alerts().state().await.unwrap();
    let state = status.state.unwrap();
    assert_eq!(state.classification, Classification::Unavailable);
    assert_eq!(state.since, first_sample);
    assert!(status.pending_recovery);

    handle.shutdown().await;
}
