use admirror::{
    FetchContext, FetchError, FetcherFactory, RateLimiter, SyncConfig, SyncError, UpstreamFetcher,
};
use admirror_api::{EntityKind, EntityRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;

use crate::client::AdPlatformClient;
use crate::models::{
    AdvertisementApiResponse, AdvertiserApiResponse, CampaignApiResponse, NetworkApiResponse,
    PlacementApiResponse, ZoneApiResponse,
};

/// Fetches collections from the ad platform REST API
pub struct HttpFetcher {
    client: AdPlatformClient,
    limiter: Arc<RateLimiter>,
}

impl HttpFetcher {
    pub fn new(client: AdPlatformClient, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    async fn collection<T, R>(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, FetchError>
    where
        T: DeserializeOwned + Into<R> + Send,
        R: Into<EntityRecord>,
    {
        let items: Vec<T> = self
            .client
            .get_all(kind.key(), &self.limiter)
            .await
            .map_err(|e| FetchError::new(kind, e.to_string()))?;
        Ok(items
            .into_iter()
            .map(|item| Into::<R>::into(item).into())
            .collect())
    }

    async fn placements(&self, ctx: &FetchContext<'_>) -> Result<Vec<EntityRecord>, FetchError> {
        let total = ctx.campaign_ids.len();
        let mut records = Vec::new();

        for (index, campaign_id) in ctx.campaign_ids.iter().enumerate() {
            let path = format!("campaigns/{}/placements", campaign_id);
            let items: Vec<PlacementApiResponse> = self
                .client
                .get_all(&path, &self.limiter)
                .await
                .map_err(|e| FetchError::new(EntityKind::Placement, e.to_string()))?;
            let fetched = items.len();
            records.extend(
                items
                    .into_iter()
                    .map(|item| EntityRecord::from(item.into_record(*campaign_id))),
            );
            ctx.progress.report(
                format!("Campaign {}: {} placements", campaign_id, fetched),
                index + 1,
                Some(total),
            );
        }

        Ok(records)
    }
}

#[async_trait]
impl UpstreamFetcher for HttpFetcher {
    fn fetcher_name(&self) -> &str {
        "http"
    }

    #[tracing::instrument(name = "upstream.fetch", skip(self, ctx), fields(base_url = self.client.base_url()))]
    async fn fetch(
        &self,
        kind: EntityKind,
        ctx: &FetchContext<'_>,
    ) -> Result<Vec<EntityRecord>, FetchError> {
        match kind {
            EntityKind::Network => {
                self.collection::<NetworkApiResponse, admirror_api::NetworkRecord>(kind)
                    .await
            }
            EntityKind::Advertiser => {
                self.collection::<AdvertiserApiResponse, admirror_api::AdvertiserRecord>(kind)
                    .await
            }
            EntityKind::Zone => {
                self.collection::<ZoneApiResponse, admirror_api::ZoneRecord>(kind)
                    .await
            }
            EntityKind::Campaign => {
                self.collection::<CampaignApiResponse, admirror_api::CampaignRecord>(kind)
                    .await
            }
            EntityKind::Advertisement => {
                self.collection::<AdvertisementApiResponse, admirror_api::AdvertisementRecord>(
                    kind,
                )
                .await
            }
            EntityKind::Placement => self.placements(ctx).await,
        }
    }
}

/// Builds an `HttpFetcher` per run from `SyncConfig`
pub struct HttpFetcherFactory {
    config: SyncConfig,
}

impl HttpFetcherFactory {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }
}

impl FetcherFactory for HttpFetcherFactory {
    fn build(&self, limiter: Arc<RateLimiter>) -> Result<Arc<dyn UpstreamFetcher>, SyncError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SyncError::ClientSetup("api_key is not configured".to_string()))?;
        if self.config.api_base_url.trim().is_empty() {
            return Err(SyncError::ClientSetup(
                "api_base_url is not configured".to_string(),
            ));
        }

        let client = AdPlatformClient::new(
            &self.config.api_base_url,
            api_key,
            self.config.request_timeout(),
            self.config.page_size,
        )
        .map_err(|e| SyncError::ClientSetup(e.to_string()))?;

        info!(
            "[HttpFetcherFactory] Client ready for {} (page_size={}, interval={}ms)",
            client.base_url(),
            self.config.page_size,
            limiter.interval().as_millis()
        );
        Ok(Arc::new(HttpFetcher::new(client, limiter)))
    }
}
