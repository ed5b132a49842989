//! Helper functions for integration tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use website_monitoring::alerts::AlertPolicy;
use website_monitoring::config::{ReportDefinition, ResolvedTargetConfig};
use website_monitoring::http::{HttpClient, ProbeError, ProbeResponse};

pub fn create_test_target(url: &str) -> ResolvedTargetConfig {
    ResolvedTargetConfig {
        url: Url::parse(url).unwrap(),
        interval: Duration::from_secs(1),
        retention: Duration::from_secs(30),
        reports: vec![ReportDefinition {
            cadence: 10,
            lookback: 30,
        }],
        alert: AlertPolicy {
            threshold: 0.8,
            hysteresis: Duration::from_secs(20),
        },
        webhook: None,
        timeout: None,
    }
}

/// In-process stand-in for a website that can be switched up and down
#[derive(Debug, Default)]
pub struct SwitchableSite {
    down: AtomicBool,
    calls: AtomicUsize,
}

impl SwitchableSite {
    pub fn up() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn down() -> Arc<Self> {
        let site = Self::default();
        site.down.store(true, Ordering::SeqCst);
        Arc::new(site)
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for SwitchableSite {
    async fn fetch(&self, _url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            Ok(ProbeResponse {
                status_code: 503,
                elapsed: Duration::from_millis(5),
            })
        } else {
            Ok(ProbeResponse {
                status_code: 200,
                elapsed: Duration::from_millis(50),
            })
        }
    }
}

/// A local url nothing listens on
pub fn unreachable_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
}
