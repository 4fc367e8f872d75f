//! Session-wide spacing of upstream requests.
//!
//! The upstream platform enforces one global quota no matter which collection is being
//! fetched, so a single limiter instance is shared by every phase of a run.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::error::SyncError;

/// Configuration for request spacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minimum gap between two permits in milliseconds (default: 5000ms).
    pub interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { interval_ms: 5_000 }
    }
}

impl RateLimitConfig {
    pub fn new(interval_ms: u64) -> Self {
        Self { interval_ms }
    }

    /// Short spacing for tests.
    pub fn for_testing() -> Self {
        Self { interval_ms: 50 }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("interval_ms must be > 0".to_string());
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Counters exposed for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitMetrics {
    pub permits_granted: u64,
    pub total_wait_ms: u64,
}

/// Single shared token source.
///
/// `acquire()` holds the internal lock while it sleeps, so concurrent callers queue behind
/// each other and are released one interval apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_permit: Mutex<Option<Instant>>,
    metrics: RwLock<RateLimitMetrics>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, SyncError> {
        config
            .validate()
            .map_err(|e| SyncError::Config(format!("Invalid rate limit config: {}", e)))?;

        Ok(Self {
            interval: config.interval(),
            last_permit: Mutex::new(None),
            metrics: RwLock::new(RateLimitMetrics::default()),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next upstream request may be issued.
    pub async fn acquire(&self) {
        let mut last = self.last_permit.lock().await;
        let mut waited = Duration::ZERO;

        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                debug!("[RateLimiter] Waiting {}ms for next permit", waited.as_millis());
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
        drop(last);

        let mut metrics = self.metrics.write().await;
        metrics.permits_granted += 1;
        metrics.total_wait_ms += waited.as_millis() as u64;
    }

    pub async fn metrics(&self) -> RateLimitMetrics {
        self.metrics.read().await.clone()
    }
}
