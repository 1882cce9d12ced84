//! Heartbeat Reporter: best-effort liveness reports to the collector.
//!
//! Every tick POSTs `{"loja_id": "<store>"}` to the configured endpoint and
//! logs one of three outcomes. There is no retry inside a tick, no backoff and
//! no circuit breaker: the loop always sleeps the full interval and tries
//! again.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::HeartbeatConfig;
use crate::identity::SiteIdentity;

/// Raw HTTP answer from the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// For transports not built on reqwest.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Outcome of one heartbeat attempt; logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// Collector answered 200.
    Delivered,
    /// Collector answered with any other status.
    Rejected { status: u16, body: String },
    /// Timeout, refused connection, DNS failure, ...
    TransportFailed(String),
}

/// Sends one heartbeat.
#[async_trait]
pub trait HeartbeatTransport: Send + Sync {
    async fn send(&self, identity: &SiteIdentity) -> Result<HeartbeatResponse, HeartbeatError>;
}

#[async_trait]
impl<T: HeartbeatTransport + ?Sized> HeartbeatTransport for std::sync::Arc<T> {
    async fn send(&self, identity: &SiteIdentity) -> Result<HeartbeatResponse, HeartbeatError> {
        (**self).send(identity).await
    }
}

#[derive(Debug, Serialize)]
struct HeartbeatPayload<'a> {
    loja_id: &'a str,
}

/// reqwest-backed transport with a per-request timeout.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, HeartbeatError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &HeartbeatConfig) -> Result<Self, HeartbeatError> {
        Self::new(&config.endpoint, config.timeout())
    }
}

#[async_trait]
impl HeartbeatTransport for HttpTransport {
    async fn send(&self, identity: &SiteIdentity) -> Result<HeartbeatResponse, HeartbeatError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&HeartbeatPayload {
                loja_id: identity.as_str(),
            })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status, error = %e, "Could not read heartbeat response body");
                format!("<unreadable body: {e}>")
            }
        };
        Ok(HeartbeatResponse { status, body })
    }
}

/// Periodic reporter for one site identity.
pub struct HeartbeatReporter<T> {
    identity: SiteIdentity,
    transport: T,
    interval: Duration,
}

impl<T: HeartbeatTransport> HeartbeatReporter<T> {
    pub fn new(identity: SiteIdentity, transport: T, interval: Duration) -> Self {
        Self {
            identity,
            transport,
            interval,
        }
    }

    /// One attempt, classified and logged.
    pub async fn beat(&self) -> HeartbeatResult {
        match self.transport.send(&self.identity).await {
            Ok(resp) if resp.status == 200 => {
                info!(loja_id = %self.identity, "Heartbeat delivered");
                HeartbeatResult::Delivered
            }
            Ok(resp) => {
                warn!(
                    loja_id = %self.identity,
                    status = resp.status,
                    body = %resp.body,
                    "Heartbeat rejected"
                );
                HeartbeatResult::Rejected {
                    status: resp.status,
                    body: resp.body,
                }
            }
            Err(e) => {
                error!(loja_id = %self.identity, error = %e, "Heartbeat failed");
                HeartbeatResult::TransportFailed(e.to_string())
            }
        }
    }

    /// Beat immediately, then once per `interval` after each attempt ends,
    /// until `cancel` fires. Returns the number of attempts made.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        info!(
            loja_id = %self.identity,
            interval_secs = self.interval.as_secs(),
            "Heartbeat reporter started"
        );

        let mut attempts: u64 = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.beat() => attempts += 1,
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(attempts, "Heartbeat reporter received shutdown signal");
        attempts
    }
}
