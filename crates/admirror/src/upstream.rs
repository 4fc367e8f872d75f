//! Upstream collection fetching
//!
//! Implementations live in separate crates (e.g. admirror-upstream for the HTTP API).
//! Every round trip must acquire a permit from the shared `RateLimiter` first.

use admirror_api::{EntityKind, EntityRecord, RemoteId};
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{FetchError, SyncError};
use crate::rate_limit::RateLimiter;

/// Fine-grained progress inside one phase
pub trait FetchProgress: Send + Sync {
    fn report(&self, message: String, current: usize, total: Option<usize>);
}

/// Progress sink that discards everything
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn report(&self, _message: String, _current: usize, _total: Option<usize>) {}
}

/// What a fetch may need from the pipeline
pub struct FetchContext<'a> {
    /// Remote ids of the campaigns currently mirrored; placements are fetched per campaign
    pub campaign_ids: Vec<RemoteId>,
    pub progress: &'a dyn FetchProgress,
}

impl<'a> FetchContext<'a> {
    pub fn new(campaign_ids: Vec<RemoteId>, progress: &'a dyn FetchProgress) -> Self {
        Self {
            campaign_ids,
            progress,
        }
    }
}

#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Identifier used in logs (e.g. "http", "static")
    fn fetcher_name(&self) -> &str;

    /// Retrieves the complete current remote collection for `kind`. Never retries.
    async fn fetch(
        &self,
        kind: EntityKind,
        ctx: &FetchContext<'_>,
    ) -> Result<Vec<EntityRecord>, FetchError>;
}

/// Builds the fetcher for one run around that run's limiter.
///
/// A failure here is channel-fatal: the run does not start.
pub trait FetcherFactory: Send + Sync {
    fn build(&self, limiter: Arc<RateLimiter>) -> Result<Arc<dyn UpstreamFetcher>, SyncError>;
}

impl<F> FetcherFactory for F
where
    F: Fn(Arc<RateLimiter>) -> Result<Arc<dyn UpstreamFetcher>, SyncError> + Send + Sync,
{
    fn build(&self, limiter: Arc<RateLimiter>) -> Result<Arc<dyn UpstreamFetcher>, SyncError> {
        self(limiter)
    }
}
