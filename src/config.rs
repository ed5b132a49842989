use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use tracing::trace;

use crate::alerts::{AlertPolicy, DEFAULT_HYSTERESIS, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub targets: Vec<TargetConfig>,

    /// Alert settings shared by every target without its own `alert` block
    pub alert: Option<AlertConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TargetConfig {
    pub url: String,
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Seconds of history to keep; defaults to the longest report lookback
    pub retention: Option<u64>,
    pub reports: Option<Vec<ReportDefinition>>,
    pub alert: Option<AlertConfig>,
    /// Per-probe timeout in seconds. Probes wait indefinitely unless this is set.
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct ReportDefinition {
    /// Seconds between two reports
    pub cadence: u64,
    /// Seconds of history each report covers
    pub lookback: u64,
}

impl ReportDefinition {
    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence)
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AlertConfig {
    pub threshold: Option<f64>,
    /// Seconds a classification must hold before alerting
    pub hysteresis: Option<u64>,
    pub webhook: Option<Webhook>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

/// Target configuration with every default applied and every value checked
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTargetConfig {
    pub url: Url,
    pub interval: Duration,
    pub retention: Duration,
    pub reports: Vec<ReportDefinition>,
    pub alert: AlertPolicy,
    pub webhook: Option<Webhook>,
    pub timeout: Option<Duration>,
}

/// Largest duration (in seconds) any setting may take: ten years
pub const MAX_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

fn default_interval() -> u64 {
    5
}

fn check_range(setting: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value > MAX_SECONDS {
        return Err(ConfigError::OutOfRange { setting, value });
    }
    Ok(value)
}

pub fn default_reports() -> Vec<ReportDefinition> {
    vec![
        ReportDefinition {
            cadence: 10,
            lookback: 600,
        },
        ReportDefinition {
            cadence: 60,
            lookback: 3600,
        },
    ]
}

impl Config {
    /// Validate every target, failing on the first invalid one
    pub fn resolve(&self) -> Result<Vec<ResolvedTargetConfig>, ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        self.targets
            .iter()
            .map(|target| target.resolve(self.alert.as_ref()))
            .collect()
    }
}

impl TargetConfig {
    pub fn resolve(
        &self,
        global_alert: Option<&AlertConfig>,
    ) -> Result<ResolvedTargetConfig, ConfigError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: only http and https targets can be probed",
                self.url
            )));
        }

        if self.interval < 1 {
            return Err(ConfigError::InvalidInterval(self.interval));
        }
        check_range("interval", self.interval)?;

        let reports = self.reports.clone().unwrap_or_else(default_reports);
        if reports.is_empty() {
            return Err(ConfigError::InvalidReport(
                "at least one report is required".to_string(),
            ));
        }
        for report in &reports {
            if report.cadence < 1 {
                return Err(ConfigError::InvalidReport(format!(
                    "cadence must be at least 1s, got {}",
                    report.cadence
                )));
            }
            if report.lookback < 1 {
                return Err(ConfigError::InvalidReport(format!(
                    "lookback must be at least 1s, got {}",
                    report.lookback
                )));
            }
            check_range("cadence", report.cadence)?;
            check_range("lookback", report.lookback)?;
        }

        let longest_lookback = reports.iter().map(|r| r.lookback).max().unwrap_or(0);
        let retention = check_range("retention", self.retention.unwrap_or(longest_lookback))?;
        if retention < longest_lookback {
            return Err(ConfigError::InvalidRetention {
                retention,
                lookback: longest_lookback,
            });
        }

        let alert = self.alert.as_ref().or(global_alert);
        let threshold = alert.and_then(|a| a.threshold).unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        let hysteresis = match alert.and_then(|a| a.hysteresis) {
            Some(secs) => Duration::from_secs(check_range("hysteresis", secs)?),
            None => DEFAULT_HYSTERESIS,
        };

        let webhook = alert.and_then(|a| a.webhook.clone());
        if let Some(webhook) = &webhook {
            Url::parse(&webhook.url)
                .map_err(|e| ConfigError::InvalidUrl(format!("{} (webhook): {e}", webhook.url)))?;
        }

        let timeout = match self.timeout {
            Some(0) => return Err(ConfigError::InvalidTimeout(0)),
            Some(secs) => Some(Duration::from_secs(check_range("timeout", secs)?)),
            None => None,
        };

        Ok(ResolvedTargetConfig {
            url,
            interval: Duration::from_secs(self.interval),
            retention: Duration::from_secs(retention),
            reports,
            alert: AlertPolicy {
                threshold,
                hysteresis,
            },
            webhook,
            timeout,
        })
    }
}

/// Read a JSON or TOML (by extension) configuration file and resolve it
pub fn read_config_file(path: impl AsRef<Path>) -> Result<Vec<ResolvedTargetConfig>, ConfigError> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            toml::from_str(&file_content).map_err(|e| ConfigError::Parse(e.to_string()))?
        }
        _ => serde_json::from_str(&file_content).map_err(|e| ConfigError::Parse(e.to_string()))?,
    };
    trace!("loaded config: {config:?}");

    config.resolve()
}

/// Errors that reject a configuration before any monitoring starts
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    Io(std::io::Error),

    /// Configuration file is not valid JSON/TOML for the expected shape
    Parse(String),

    InvalidUrl(String),

    /// Check interval below one second
    InvalidInterval(u64),

    InvalidReport(String),

    /// Retention shorter than a report lookback
    InvalidRetention { retention: u64, lookback: u64 },

    /// Availability threshold outside [0, 1]
    InvalidThreshold(f64),

    /// Probe timeout of zero seconds
    InvalidTimeout(u64),

    /// A duration setting above [`MAX_SECONDS`]
    OutOfRange { setting: &'static str, value: u64 },

    NoTargets,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "could not read configuration: {}", err),
            ConfigError::Parse(msg) => write!(f, "invalid configuration file: {}", msg),
            ConfigError::InvalidUrl(msg) => write!(f, "invalid target url {}", msg),
            ConfigError::InvalidInterval(interval) => {
                write!(f, "check interval must be at least 1s, got {}", interval)
            }
            ConfigError::InvalidReport(msg) => write!(f, "invalid report: {}", msg),
            ConfigError::InvalidRetention {
                retention,
                lookback,
            } => write!(
                f,
                "retention of {}s is shorter than a report lookback of {}s",
                retention, lookback
            ),
            ConfigError::InvalidThreshold(threshold) => {
                write!(f, "alert threshold must be within [0, 1], got {}", threshold)
            }
            ConfigError::InvalidTimeout(timeout) => {
                write!(f, "probe timeout must be at least 1s, got {}", timeout)
            }
            ConfigError::OutOfRange { setting, value } => write!(
                f,
                "{} of {}s exceeds the maximum of {}s",
                setting, value, MAX_SECONDS
            ),
            ConfigError::NoTargets => write!(f, "no targets configured"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            _ => None,
        }
    }
}
