#![allow(dead_code)]

use admirror::{MemoryMirror, MemorySyncStateStore, RateLimitConfig, StaticDataset, SyncService};
use admirror_api::{
    AdvertisementRecord, AdvertiserRecord, CampaignRecord, EntityKind, NetworkRecord,
    PlacementRecord, ZoneRecord,
};
use std::sync::Arc;

pub const CAMPAIGN_IDS: [i64; 2] = [300, 301];

/// A small but complete upstream: two of everything, three placements over two campaigns
pub async fn seeded_dataset() -> Arc<StaticDataset> {
    let dataset = Arc::new(StaticDataset::new(2));
    dataset
        .set_collection(
            EntityKind::Network,
            vec![
                NetworkRecord::remote(100, "Main network").into(),
                NetworkRecord::remote(101, "Partner network").into(),
            ],
        )
        .await;
    dataset
        .set_collection(
            EntityKind::Advertiser,
            vec![
                AdvertiserRecord::remote(200, "Acme").into(),
                AdvertiserRecord::remote(201, "Globex").into(),
            ],
        )
        .await;
    dataset
        .set_collection(
            EntityKind::Zone,
            vec![
                ZoneRecord::remote(400, "Header").into(),
                ZoneRecord::remote(401, "Sidebar").into(),
            ],
        )
        .await;
    dataset
        .set_collection(
            EntityKind::Campaign,
            CAMPAIGN_IDS
                .iter()
                .map(|id| CampaignRecord::remote(*id, format!("Campaign {}", id)).into())
                .collect(),
        )
        .await;
    dataset
        .set_collection(
            EntityKind::Advertisement,
            vec![
                AdvertisementRecord::remote(500, "Banner 728x90").into(),
                AdvertisementRecord::remote(501, "Skyscraper").into(),
            ],
        )
        .await;
    dataset
        .set_collection(
            EntityKind::Placement,
            vec![
                PlacementRecord::remote(600, 500, 300, 400).into(),
                PlacementRecord::remote(601, 501, 300, 401).into(),
                PlacementRecord::remote(602, 500, 301, 400).into(),
            ],
        )
        .await;
    dataset
}

pub struct Harness {
    pub dataset: Arc<StaticDataset>,
    pub mirror: Arc<MemoryMirror>,
    pub state_store: Arc<MemorySyncStateStore>,
    pub service: SyncService,
}

pub async fn harness(dataset: Arc<StaticDataset>) -> Harness {
    harness_with_mirror(dataset, Arc::new(MemoryMirror::new())).await
}

pub async fn harness_with_mirror(
    dataset: Arc<StaticDataset>,
    mirror: Arc<MemoryMirror>,
) -> Harness {
    let state_store = Arc::new(MemorySyncStateStore::new());
    let service = SyncService::new(
        RateLimitConfig::for_testing(),
        mirror.clone(),
        Arc::new(dataset.factory()),
        state_store.clone(),
    )
    .await
    .expect("service should build");

    Harness {
        dataset,
        mirror,
        state_store,
        service,
    }
}

/// A placement created locally against a local campaign draft
pub fn local_placement(campaign_local_ref: &str) -> PlacementRecord {
    PlacementRecord {
        remote_id: None,
        local_id: Some(format!("local-placement-{}", campaign_local_ref)),
        advertisement_remote_id: Some(500),
        campaign_remote_ref: None,
        campaign_local_ref: Some(campaign_local_ref.to_string()),
        zone_remote_ref: Some(400),
        zone_local_ref: None,
    }
}
