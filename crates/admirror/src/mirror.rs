//! Local mirror persistence boundary
//!
//! The pipeline only needs "replace synced records of type T, preserve local-only records
//! of type T". Query mechanics belong to the storage implementation.

use admirror_api::{EntityKind, EntityRecord, Identity};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub removed: usize,
    pub inserted: usize,
}

#[async_trait]
pub trait LocalMirror: Send + Sync {
    async fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>>;

    /// Adds one record, e.g. an entity created locally before any sync
    async fn insert(&self, record: EntityRecord) -> Result<()>;

    /// Drops every synced record of `kind` and stores `records` in their place.
    /// Local-only records of `kind` are left untouched.
    async fn replace_synced(
        &self,
        kind: EntityKind,
        records: Vec<EntityRecord>,
    ) -> Result<ReplaceOutcome>;

    /// Drops every synced record of every kind; returns how many were removed
    async fn purge_synced(&self) -> Result<usize>;
}

fn check_identity(record: &EntityRecord) -> Result<()> {
    if !record.has_identity() {
        return Err(StorageError::MissingIdentity(record.name()));
    }
    if let EntityRecord::Placement(placement) = record {
        placement
            .validate()
            .map_err(|v| StorageError::InvalidRecord(format!("{}: {}", record.name(), v)))?;
    }
    Ok(())
}

/// HashMap-backed mirror
#[derive(Debug, Default)]
pub struct MemoryMirror {
    records: RwLock<HashMap<EntityKind, Vec<EntityRecord>>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records grouped by kind
    pub async fn snapshot(&self) -> BTreeMap<EntityKind, Vec<EntityRecord>> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(kind, list)| (*kind, list.clone()))
            .collect()
    }

    pub async fn count(&self, kind: EntityKind) -> usize {
        self.records
            .read()
            .await
            .get(&kind)
            .map(|list| list.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl LocalMirror for MemoryMirror {
    async fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert(&self, record: EntityRecord) -> Result<()> {
        check_identity(&record)?;
        self.records
            .write()
            .await
            .entry(record.kind())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn replace_synced(
        &self,
        kind: EntityKind,
        records: Vec<EntityRecord>,
    ) -> Result<ReplaceOutcome> {
        for record in &records {
            if record.kind() != kind {
                return Err(StorageError::KindMismatch {
                    expected: kind,
                    actual: record.kind(),
                });
            }
            if !record.is_synced() {
                return Err(StorageError::InvalidRecord(format!(
                    "{} has no remote id",
                    record.name()
                )));
            }
            check_identity(record)?;
        }

        let mut all = self.records.write().await;
        let list = all.entry(kind).or_default();
        let before = list.len();
        list.retain(|r| !r.is_synced());
        let removed = before - list.len();
        let inserted = records.len();
        list.extend(records);

        debug!(
            "[MemoryMirror] Replaced synced {}: removed={}, inserted={}, local_only={}",
            kind,
            removed,
            inserted,
            list.len() - inserted
        );
        Ok(ReplaceOutcome { removed, inserted })
    }

    async fn purge_synced(&self) -> Result<usize> {
        let mut all = self.records.write().await;
        let mut removed = 0;
        for list in all.values_mut() {
            let before = list.len();
            list.retain(|r| !r.is_synced());
            removed += before - list.len();
        }
        debug!("[MemoryMirror] Purged {} synced records", removed);
        Ok(removed)
    }
}
