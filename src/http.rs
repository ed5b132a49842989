//! HTTP probing boundary
//!
//! The probe actor only needs a status code and how long the request took. Hiding the
//! client behind [`HttpClient`] lets tests drive the schedulers with scripted responses.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Url;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status_code: u16,
    pub elapsed: Duration,
}

/// A probe that never got a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Transport { message: String, elapsed: Duration },
}

impl ProbeError {
    /// Time spent before the request failed
    pub fn elapsed(&self) -> Duration {
        match self {
            ProbeError::Transport { elapsed, .. } => *elapsed,
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Transport { message, elapsed } => {
                write!(f, "request failed after {:?}: {}", elapsed, message)
            }
        }
    }
}

impl std::error::Error for ProbeError {}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue one request and wait for its status line, however long that takes
    async fn fetch(&self, url: &Url) -> Result<ProbeResponse, ProbeError>;
}

/// Production client backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Client without any request timeout
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: Self::builder().build()?,
        })
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Self::builder().timeout(timeout).build()?,
        })
    }

    // redirects are not followed; a 3xx is what the target answered
    fn builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder().redirect(reqwest::redirect::Policy::none())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        let start = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ProbeError::Transport {
                message: format!("{e:#}"),
                elapsed: start.elapsed(),
            })?;

        let elapsed = start.elapsed();
        let status_code = response.status().as_u16();
        trace!("{url} answered {status_code} in {elapsed:?}");

        Ok(ProbeResponse {
            status_code,
            elapsed,
        })
    }
}
