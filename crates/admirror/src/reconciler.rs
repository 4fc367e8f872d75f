//! Merges a freshly fetched remote collection into the local mirror.
//!
//! Remote is the source of truth for anything that has a remote id. Local-only records are
//! unpushed work and survive a sync unchanged.

use admirror_api::{EntityKind, EntityRecord, Identity, RemoteId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::mirror::LocalMirror;

/// A fetched record that was kept out of the mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub remote_id: Option<RemoteId>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub kind: EntityKind,
    pub written: usize,
    pub rejected: usize,
    /// Previously synced records that were dropped
    pub removed: usize,
    /// Local-only records left in place
    pub preserved: usize,
    pub rejections: Vec<Rejection>,
}

impl MergeSummary {
    /// Something was fetched but nothing was usable
    pub fn all_rejected(&self) -> bool {
        self.written == 0 && self.rejected > 0
    }
}

pub struct Reconciler {
    mirror: Arc<dyn LocalMirror>,
}

impl Reconciler {
    pub fn new(mirror: Arc<dyn LocalMirror>) -> Self {
        Self { mirror }
    }

    #[tracing::instrument(name = "sync.reconcile", skip(self, remote_records), fields(fetched = remote_records.len()))]
    pub async fn reconcile(
        &self,
        kind: EntityKind,
        remote_records: Vec<EntityRecord>,
    ) -> Result<MergeSummary, StorageError> {
        let current = self.mirror.list(kind).await?;
        let (synced, local_only): (Vec<_>, Vec<_>) =
            current.iter().partition(|record| record.is_synced());
        debug!(
            "[Reconciler] {} before merge: synced={}, local_only={}",
            kind,
            synced.len(),
            local_only.len()
        );

        let mut accepted: Vec<EntityRecord> = Vec::with_capacity(remote_records.len());
        let mut positions: HashMap<RemoteId, usize> = HashMap::new();
        let mut rejections = Vec::new();

        for record in remote_records {
            if let Some(reason) = rejection_reason(kind, &record) {
                rejections.push(Rejection {
                    remote_id: record.remote_id(),
                    reason,
                });
                continue;
            }

            // Checked by rejection_reason
            let Some(remote_id) = record.remote_id() else {
                continue;
            };
            match positions.get(&remote_id) {
                Some(&index) => {
                    debug!(
                        "[Reconciler] Duplicate {} remote id {}, keeping the later record",
                        kind, remote_id
                    );
                    accepted[index] = record;
                }
                None => {
                    positions.insert(remote_id, accepted.len());
                    accepted.push(record);
                }
            }
        }

        for rejection in &rejections {
            warn!(
                "[Reconciler] Rejected {} record {:?}: {}",
                kind, rejection.remote_id, rejection.reason
            );
        }

        let outcome = self.mirror.replace_synced(kind, accepted).await?;
        let summary = MergeSummary {
            kind,
            written: outcome.inserted,
            rejected: rejections.len(),
            removed: outcome.removed,
            preserved: local_only.len(),
            rejections,
        };

        info!(
            "[Reconciler] Merged {}: written={}, rejected={}, removed={}, preserved={}",
            kind, summary.written, summary.rejected, summary.removed, summary.preserved
        );
        Ok(summary)
    }
}

fn rejection_reason(kind: EntityKind, record: &EntityRecord) -> Option<String> {
    if record.kind() != kind {
        return Some(format!("expected a {} record, got {}", kind, record.kind()));
    }
    if record.remote_id().is_none() {
        return Some("fetched record has no remote id".to_string());
    }
    if let EntityRecord::Placement(placement) = record {
        if let Err(violation) = placement.validate() {
            return Some(violation.to_string());
        }
    }
    None
}
