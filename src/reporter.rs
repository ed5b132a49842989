//! Report sinks
//!
//! Report actors never format or print anything themselves. They hand every
//! [`ReportEvent`] to a [`Reporter`], which decides what to do with it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, trace, warn};

use crate::ReportEvent;
use crate::alerts::AlertKind;
use crate::config::Webhook;

#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, event: &ReportEvent);
}

/// Writes every report as a structured log line and remembers all alerts
#[derive(Debug, Default)]
pub struct LogReporter {
    history: Mutex<Vec<String>>,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every alert reported so far, oldest first, prefixed with its target
    pub fn alert_history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

fn format_optional<T>(value: Option<T>, format: impl Fn(T) -> String) -> String {
    value.map(format).unwrap_or_else(|| "no data".to_string())
}

fn format_latency(latency: Duration) -> String {
    format!("{:.3}s", latency.as_secs_f64())
}

#[async_trait]
impl Reporter for LogReporter {
    async fn report(&self, event: &ReportEvent) {
        let snapshot = &event.snapshot;
        info!(
            url = %event.url,
            lookback_mins = event.lookback.as_secs() / 60,
            availability = %format_optional(snapshot.availability, |a| format!("{:.0}%", a * 100.0)),
            avg_latency = %format_optional(snapshot.avg_latency, format_latency),
            max_latency = %format_optional(snapshot.max_latency, format_latency),
            "report at {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S")
        );

        if let Some(alert) = &event.alert {
            warn!(url = %event.url, "{alert}");
            if let Ok(mut history) = self.history.lock() {
                history.push(format!("{}: {alert}", event.url));
            }
        }
    }
}

/// Publishes report events to any number of subscribers
#[derive(Debug, Clone)]
pub struct BroadcastReporter {
    sender: broadcast::Sender<ReportEvent>,
}

impl BroadcastReporter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Reporter for BroadcastReporter {
    async fn report(&self, event: &ReportEvent) {
        // It's OK if there are no subscribers
        match self.sender.send(event.clone()) {
            Ok(num_receivers) => trace!("published report to {num_receivers} receivers"),
            Err(_) => trace!("no receivers for report"),
        }
    }
}

/// Posts alerts to a webhook; reports without an alert are ignored
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    client: Client,
    webhook: Webhook,
}

/// Upper bound for a single webhook delivery
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

impl WebhookReporter {
    pub fn new(webhook: Webhook) -> anyhow::Result<Self> {
        Self::with_timeout(webhook, WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(webhook: Webhook, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            webhook,
        })
    }

    fn format_message(event: &ReportEvent, kind: AlertKind, availability: f64) -> String {
        match kind {
            AlertKind::SiteDown => format!(
                "🔴 **Site Down**: `{}` availability is **{:.0}%**",
                event.url,
                availability * 100.0
            ),
            AlertKind::SiteBack => format!(
                "✅ **Site Back**: `{}` availability is back to **{:.0}%**",
                event.url,
                availability * 100.0
            ),
        }
    }
}

#[async_trait]
impl Reporter for WebhookReporter {
    #[instrument(skip_all, fields(url = %event.url))]
    async fn report(&self, event: &ReportEvent) {
        let Some(alert) = &event.alert else {
            return;
        };

        let payload = json!({
            "message": Self::format_message(event, alert.kind, alert.availability),
            "url": event.url.as_str(),
            "status": match alert.kind {
                AlertKind::SiteDown => "down",
                AlertKind::SiteBack => "up",
            },
            "availability": alert.availability,
            "alerted_at": alert.at.to_rfc3339(),
            "timestamp": Utc::now().to_rfc3339()
        });

        match self.client.post(&self.webhook.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
            }
        }
    }
}

/// Fans every event out to several reporters, in order
#[derive(Clone, Default)]
pub struct Reporters {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl Reporters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

#[async_trait]
impl Reporter for Reporters {
    async fn report(&self, event: &ReportEvent) {
        for reporter in &self.reporters {
            reporter.report(event).await;
        }
    }
}
