//! HTTP transport settings and per-service request accounting

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::client::Service;

const USER_AGENT: &str = concat!("terraform-provider-baiducloud/", env!("CARGO_PKG_VERSION"));

pub struct TransportConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

impl TransportConfig {
    /// Connect timeout never exceeds the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self.connect_timeout = self.connect_timeout.min(timeout);
        self
    }

    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.idle_timeout)
            .pool_max_idle_per_host(self.max_idle_per_host);

        if let Some(keepalive) = self.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build()
    }
}

/// How one HTTP exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Throttled,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestCounts {
    pub sent: u64,
    pub throttled: u64,
    pub failed: u64,
    pub last_sent: Option<Instant>,
}

#[derive(Default)]
pub struct RequestStats {
    counts: RwLock<HashMap<Service, RequestCounts>>,
}

impl RequestStats {
    pub async fn record(&self, service: Service, outcome: Outcome) {
        let mut counts = self.counts.write().await;
        let entry = counts.entry(service).or_default();
        entry.sent += 1;
        entry.last_sent = Some(Instant::now());
        match outcome {
            Outcome::Success => {}
            Outcome::Throttled => entry.throttled += 1,
            Outcome::Failed => entry.failed += 1,
        }
    }

    pub async fn for_service(&self, service: Service) -> RequestCounts {
        self.counts
            .read()
            .await
            .get(&service)
            .copied()
            .unwrap_or_default()
    }
}
