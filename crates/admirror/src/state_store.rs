//! Persistence of the sync session across restarts
//!
//! Only the completion stamp survives a restart; everything else in the session is
//! per-run state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StorageError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSyncState {
    pub last_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_overall_success: Option<bool>,
}

#[async_trait]
pub trait SyncStateStore: Send + Sync {
    /// Returns the default state if nothing was saved yet
    async fn load(&self) -> Result<PersistedSyncState, StorageError>;

    async fn save(&self, state: &PersistedSyncState) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemorySyncStateStore {
    state: RwLock<PersistedSyncState>,
}

impl MemorySyncStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedSyncState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl SyncStateStore for MemorySyncStateStore {
    async fn load(&self) -> Result<PersistedSyncState, StorageError> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &PersistedSyncState) -> Result<(), StorageError> {
        *self.state.write().await = state.clone();
        Ok(())
    }
}

/// JSON file store; the file is replaced on every save
pub struct FileSyncStateStore {
    path: PathBuf,
}

impl FileSyncStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SyncStateStore for FileSyncStateStore {
    async fn load(&self) -> Result<PersistedSyncState, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "[FileSyncStateStore] No state at {}, starting fresh",
                    self.path.display()
                );
                return Ok(PersistedSyncState::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, state: &PersistedSyncState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;

        // Temp file then rename; readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!(
            "[FileSyncStateStore] Saved sync state to {}",
            self.path.display()
        );
        Ok(())
    }
}
