//! In-process upstream for tests and offline mode
//!
//! `StaticDataset` holds the collections the fake upstream serves and survives across runs;
//! each run gets its own `StaticFetcher` bound to that run's rate limiter.
//! - Collections are served in pages of `page_size`, one permit per page
//! - Placements are served per campaign, like the real API
//! - Failures can be injected per entity type

use admirror_api::{EntityKind, EntityRecord, RemoteId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::error::{FetchError, SyncError};
use crate::rate_limit::RateLimiter;
use crate::upstream::{FetchContext, FetcherFactory, UpstreamFetcher};

/// One simulated upstream round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub kind: EntityKind,
    pub campaign_id: Option<RemoteId>,
    pub at: Instant,
}

#[derive(Debug)]
pub struct StaticDataset {
    collections: RwLock<HashMap<EntityKind, Vec<EntityRecord>>>,
    failures: RwLock<HashMap<EntityKind, String>>,
    calls: Mutex<Vec<FetchCall>>,
    page_size: usize,
}

impl Default for StaticDataset {
    fn default() -> Self {
        Self::new(100)
    }
}

impl StaticDataset {
    pub fn new(page_size: usize) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            page_size: page_size.max(1),
        }
    }

    pub async fn set_collection(&self, kind: EntityKind, records: Vec<EntityRecord>) {
        self.collections.write().await.insert(kind, records);
    }

    /// Makes every fetch of `kind` fail with `message`
    pub async fn fail(&self, kind: EntityKind, message: impl Into<String>) {
        self.failures.write().await.insert(kind, message.into());
    }

    pub async fn clear_failure(&self, kind: EntityKind) {
        self.failures.write().await.remove(&kind);
    }

    pub async fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().await.clone()
    }

    /// Factory producing a fresh fetcher over this dataset for every run
    pub fn factory(self: &Arc<Self>) -> impl FetcherFactory {
        let dataset = Arc::clone(self);
        move |limiter: Arc<RateLimiter>| -> Result<Arc<dyn UpstreamFetcher>, SyncError> {
            Ok(Arc::new(StaticFetcher::new(dataset.clone(), limiter)))
        }
    }
}

pub struct StaticFetcher {
    dataset: Arc<StaticDataset>,
    limiter: Arc<RateLimiter>,
}

impl StaticFetcher {
    pub fn new(dataset: Arc<StaticDataset>, limiter: Arc<RateLimiter>) -> Self {
        Self { dataset, limiter }
    }

    async fn round_trip(&self, kind: EntityKind, campaign_id: Option<RemoteId>) {
        self.limiter.acquire().await;
        self.dataset.calls.lock().await.push(FetchCall {
            kind,
            campaign_id,
            at: Instant::now(),
        });
    }

    /// One permit per page; an empty collection still costs one request
    async fn paged(
        &self,
        kind: EntityKind,
        campaign_id: Option<RemoteId>,
        records: Vec<EntityRecord>,
    ) -> Vec<EntityRecord> {
        let pages = records.len().div_ceil(self.dataset.page_size).max(1);
        for _ in 0..pages {
            self.round_trip(kind, campaign_id).await;
        }
        records
    }
}

#[async_trait]
impl UpstreamFetcher for StaticFetcher {
    fn fetcher_name(&self) -> &str {
        "static"
    }

    async fn fetch(
        &self,
        kind: EntityKind,
        ctx: &FetchContext<'_>,
    ) -> Result<Vec<EntityRecord>, FetchError> {
        let failure = self.dataset.failures.read().await.get(&kind).cloned();
        if let Some(message) = failure {
            self.round_trip(kind, None).await;
            return Err(FetchError::new(kind, message));
        }

        let records = self
            .dataset
            .collections
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        if kind != EntityKind::Placement {
            return Ok(self.paged(kind, None, records).await);
        }

        let total = ctx.campaign_ids.len();
        let mut placements = Vec::new();
        for (index, campaign_id) in ctx.campaign_ids.iter().enumerate() {
            let for_campaign: Vec<EntityRecord> = records
                .iter()
                .filter(|r| match r {
                    EntityRecord::Placement(p) => p.campaign_remote_ref == Some(*campaign_id),
                    _ => false,
                })
                .cloned()
                .collect();
            placements.extend(self.paged(kind, Some(*campaign_id), for_campaign).await);
            ctx.progress.report(
                format!("Fetched placements for campaign {}", campaign_id),
                index + 1,
                Some(total),
            );
        }
        Ok(placements)
    }
}
