mod common;

use admirror::{
    FileSyncStateStore, LocalMirror, MemoryMirror, RateLimitConfig, RateLimiter, ReplaceOutcome,
    StorageError, SyncError, SyncService, SyncStateStore, UpstreamFetcher,
};
use admirror_api::{
    AdvertiserRecord, CampaignRecord, EntityKind, EntityRecord, Identity, PhaseKey,
    PlacementRecord,
};
use anyhow::Result;
use async_trait::async_trait;
use common::{harness, harness_with_mirror, local_placement, seeded_dataset, CAMPAIGN_IDS};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn test_phases_fetch_in_dependency_order() -> Result<()> {
    let h = harness(seeded_dataset().await).await;
    let response = h.service.run_blocking().await?;

    assert!(response.success);
    assert!(response.overall_success);
    let keys: Vec<&str> = response.results.keys().map(|k| k.as_str()).collect();
    for key in PhaseKey::ORDER {
        assert!(keys.contains(&key.as_str()), "missing result for {}", key);
    }

    let kinds: Vec<EntityKind> = h.dataset.calls().await.iter().map(|c| c.kind).collect();
    let position = |kind: &EntityKind| {
        EntityKind::ALL
            .iter()
            .position(|k| k == kind)
            .unwrap_or(usize::MAX)
    };
    assert!(
        kinds.windows(2).all(|w| position(&w[0]) <= position(&w[1])),
        "fetches out of order: {:?}",
        kinds
    );
    assert_eq!(kinds.first(), Some(&EntityKind::Network));
    assert_eq!(kinds.last(), Some(&EntityKind::Placement));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_every_upstream_call_is_spaced_by_the_interval() -> Result<()> {
    let h = harness(seeded_dataset().await).await;
    h.service.run_blocking().await?;

    let calls = h.dataset.calls().await;
    // 6 collections, 1 page each at page size 2, plus one call per campaign for placements
    assert_eq!(calls.len(), 5 + CAMPAIGN_IDS.len());

    let interval = RateLimitConfig::for_testing().interval();
    for pair in calls.windows(2) {
        let gap = pair[1].at - pair[0].at;
        assert!(
            gap >= interval,
            "{:?} and {:?} only {:?} apart",
            pair[0].kind,
            pair[1].kind,
            gap
        );
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_phase_does_not_stop_later_phases() -> Result<()> {
    let dataset = seeded_dataset().await;
    dataset.fail(EntityKind::Zone, "HTTP 500 Internal Server Error").await;
    let h = harness(dataset).await;

    let response = h.service.run_blocking().await?;

    assert!(response.success);
    assert!(!response.overall_success);
    let zones = &response.results["zones"];
    assert!(!zones.success);
    assert!(zones
        .error
        .as_deref()
        .is_some_and(|e| e.contains("HTTP 500")));

    for later in ["campaigns", "advertisements", "placements"] {
        assert!(response.results[later].success, "{} should have run", later);
    }
    assert_eq!(response.results["placements"].count, 3);
    assert_eq!(h.mirror.count(EntityKind::Zone).await, 0);

    let status = h.service.status().await;
    assert!(!status.is_active);
    assert_eq!(status.progress_percent, 100);
    assert_eq!(status.errors.len(), 1);
    assert!(status.errors[0].starts_with("Zones: "));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_local_only_records_survive_sync() -> Result<()> {
    let mirror = Arc::new(MemoryMirror::new());
    let draft_advertiser = AdvertiserRecord::local("Draft advertiser");
    let draft_campaign = CampaignRecord::local("Draft campaign");
    let draft_placement = local_placement("draft-campaign");
    mirror.insert(draft_advertiser.clone().into()).await?;
    mirror.insert(draft_campaign.clone().into()).await?;
    mirror.insert(draft_placement.clone().into()).await?;
    // Stale synced record that no longer exists upstream
    mirror
        .insert(AdvertiserRecord::remote(999, "Deleted upstream").into())
        .await?;

    let h = harness_with_mirror(seeded_dataset().await, mirror.clone()).await;
    let response = h.service.run_blocking().await?;
    assert!(response.overall_success);

    let advertisers = mirror.list(EntityKind::Advertiser).await?;
    assert!(advertisers.contains(&EntityRecord::from(draft_advertiser)));
    assert!(advertisers.iter().all(|a| a.remote_id() != Some(999)));
    assert_eq!(advertisers.len(), 3);

    let campaigns = mirror.list(EntityKind::Campaign).await?;
    assert!(campaigns.contains(&EntityRecord::from(draft_campaign)));

    let placements = mirror.list(EntityKind::Placement).await?;
    assert!(placements.contains(&EntityRecord::from(draft_placement)));
    assert_eq!(placements.len(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_counts_every_removed_synced_record() -> Result<()> {
    let h = harness(seeded_dataset().await).await;
    h.service.run_blocking().await?;

    let second = h.service.run_blocking().await?;
    // 2 networks + 2 advertisers + 2 zones + 2 campaigns + 2 ads + 3 placements
    assert_eq!(second.results["cleanup"].count, 13);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_invalid_placements_are_excluded_and_counted() -> Result<()> {
    let dataset = seeded_dataset().await;
    let mut ambiguous = PlacementRecord::remote(610, 500, 300, 400);
    ambiguous.zone_local_ref = Some("zone-draft".to_string());
    let mut orphan = PlacementRecord::remote(611, 500, 301, 400);
    orphan.zone_remote_ref = None;
    dataset
        .set_collection(
            EntityKind::Placement,
            vec![
                PlacementRecord::remote(600, 500, 300, 400).into(),
                ambiguous.into(),
                orphan.into(),
            ],
        )
        .await;
    let h = harness(dataset).await;

    let response = h.service.run_blocking().await?;
    assert!(response.overall_success);
    assert_eq!(response.results["placements"].count, 1);

    let placements = h.mirror.list(EntityKind::Placement).await?;
    assert_eq!(placements.len(), 1);
    for placement in placements {
        let EntityRecord::Placement(p) = placement else {
            panic!("non-placement stored as placement");
        };
        assert!(p.is_valid());
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_phase_fails_when_every_fetched_record_is_invalid() -> Result<()> {
    let dataset = seeded_dataset().await;
    let mut both = PlacementRecord::remote(620, 500, 300, 400);
    both.campaign_local_ref = Some("c".to_string());
    dataset
        .set_collection(EntityKind::Placement, vec![both.into()])
        .await;
    let h = harness(dataset).await;

    let response = h.service.run_blocking().await?;
    assert!(!response.overall_success);
    assert!(!response.results["placements"].success);
    assert_eq!(h.mirror.count(EntityKind::Placement).await, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_two_runs_leave_identical_mirror() -> Result<()> {
    let mirror = Arc::new(MemoryMirror::new());
    mirror
        .insert(AdvertiserRecord::local("Draft advertiser").into())
        .await?;
    let h = harness_with_mirror(seeded_dataset().await, mirror.clone()).await;

    h.service.run_blocking().await?;
    let first = mirror.snapshot().await;
    h.service.run_blocking().await?;
    let second = mirror.snapshot().await;

    assert_eq!(first, second);
    assert_eq!(first.values().map(|v| v.len()).sum::<usize>(), 14);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_start_is_rejected_without_touching_the_run() -> Result<()> {
    let h = harness(seeded_dataset().await).await;

    let stream = h.service.run_streaming().await?;
    let before = h.service.status().await;
    assert!(before.is_active);

    let second = h.service.run_blocking().await;
    let err = second.expect_err("second start must be rejected");
    assert!(matches!(err, SyncError::AlreadyRunning));
    assert_eq!(err.status_code(), 409);
    assert!(matches!(
        h.service.run_streaming().await,
        Err(SyncError::AlreadyRunning)
    ));
    assert_eq!(h.service.status().await.errors, before.errors);

    drain(stream).await;
    assert!(!h.service.session().is_active().await);
    assert!(h.service.run_blocking().await?.overall_success);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_rejected_while_a_run_is_active() -> Result<()> {
    let h = harness(seeded_dataset().await).await;

    let stream = h.service.run_streaming().await?;
    assert!(matches!(
        h.service.reset().await,
        Err(SyncError::AlreadyRunning)
    ));
    // The run still owns the session, so a third start is refused too
    assert!(h.service.status().await.is_active);
    assert!(matches!(
        h.service.run_blocking().await,
        Err(SyncError::AlreadyRunning)
    ));

    drain(stream).await;
    assert!(h.service.status().await.last_completed_at.is_some());
    h.service.reset().await?;
    assert_eq!(h.service.status().await.last_completed_at, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unbuildable_rate_limiter_is_channel_fatal() -> Result<()> {
    let dataset = seeded_dataset().await;
    let stamp = chrono::Utc::now() - chrono::Duration::days(1);
    let state_store = Arc::new(admirror::MemorySyncStateStore::with_state(
        admirror::PersistedSyncState {
            last_completed_at: Some(stamp),
            last_overall_success: Some(true),
        },
    ));
    let service = SyncService::new(
        RateLimitConfig::new(0),
        Arc::new(MemoryMirror::new()),
        Arc::new(dataset.factory()),
        state_store,
    )
    .await?;

    let response = service.run_blocking().await?;
    assert!(!response.success);
    assert!(response.results.is_empty());
    assert!(response.error.is_some());

    let status = service.status().await;
    assert!(!status.is_active);
    assert_eq!(status.last_completed_at, Some(stamp));
    assert!(dataset.calls().await.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_completion_stamp_is_persisted_and_reloaded() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("state.json");
    let dataset = seeded_dataset().await;

    let service = SyncService::new(
        RateLimitConfig::for_testing(),
        Arc::new(MemoryMirror::new()),
        Arc::new(dataset.factory()),
        Arc::new(FileSyncStateStore::new(&path)),
    )
    .await?;
    service.run_blocking().await?;
    let completed_at = service.status().await.last_completed_at;
    assert!(completed_at.is_some());

    let persisted = FileSyncStateStore::new(&path).load().await?;
    assert_eq!(persisted.last_completed_at, completed_at);
    assert_eq!(persisted.last_overall_success, Some(true));

    let restarted = SyncService::new(
        RateLimitConfig::for_testing(),
        Arc::new(MemoryMirror::new()),
        Arc::new(dataset.factory()),
        Arc::new(FileSyncStateStore::new(&path)),
    )
    .await?;
    assert_eq!(restarted.status().await.last_completed_at, completed_at);

    restarted.reset().await?;
    assert_eq!(restarted.status().await.last_completed_at, None);
    let cleared = FileSyncStateStore::new(&path).load().await?;
    assert_eq!(cleared.last_completed_at, None);
    Ok(())
}

/// Mirror whose writes for one kind always fail
struct FailingWrites {
    inner: MemoryMirror,
    kind: EntityKind,
}

#[async_trait]
impl LocalMirror for FailingWrites {
    async fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, StorageError> {
        self.inner.list(kind).await
    }

    async fn insert(&self, record: EntityRecord) -> Result<(), StorageError> {
        self.inner.insert(record).await
    }

    async fn replace_synced(
        &self,
        kind: EntityKind,
        records: Vec<EntityRecord>,
    ) -> Result<ReplaceOutcome, StorageError> {
        if kind == self.kind {
            return Err(StorageError::IoError(std::io::Error::other("disk full")));
        }
        self.inner.replace_synced(kind, records).await
    }

    async fn purge_synced(&self) -> Result<usize, StorageError> {
        self.inner.purge_synced().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_storage_failure_is_scoped_to_its_phase() -> Result<()> {
    let dataset = seeded_dataset().await;
    let mirror = Arc::new(FailingWrites {
        inner: MemoryMirror::new(),
        kind: EntityKind::Advertiser,
    });
    let service = SyncService::new(
        RateLimitConfig::for_testing(),
        mirror.clone(),
        Arc::new(dataset.factory()),
        Arc::new(admirror::MemorySyncStateStore::new()),
    )
    .await?;

    let response = service.run_blocking().await?;
    assert!(!response.overall_success);
    assert!(!response.results["advertisers"].success);
    assert!(response.results["advertisers"]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("disk full")));
    assert!(response.results["zones"].success);
    assert_eq!(mirror.inner.count(EntityKind::Zone).await, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_fetcher_setup_failure_is_channel_fatal() -> Result<()> {
    let factory = |_limiter: Arc<RateLimiter>| -> Result<Arc<dyn UpstreamFetcher>, SyncError> {
        Err(SyncError::ClientSetup("api_key is not configured".to_string()))
    };
    let service = SyncService::new(
        RateLimitConfig::for_testing(),
        Arc::new(MemoryMirror::new()),
        Arc::new(factory),
        Arc::new(admirror::MemorySyncStateStore::new()),
    )
    .await?;

    let response = service.run_blocking().await?;
    assert!(!response.success);
    assert!(response
        .error
        .as_deref()
        .is_some_and(|e| e.contains("api_key")));
    assert_eq!(service.status().await.errors.len(), 1);

    // The session is usable again afterwards
    assert!(matches!(
        service.session().state().await,
        admirror::SessionState::Idle
    ));
    assert!(service.run_blocking().await.is_ok());
    Ok(())
}

async fn drain(stream: admirror::SyncEventStream) {
    use tokio_stream::StreamExt;
    let _events: Vec<_> = stream.collect().await;
}
