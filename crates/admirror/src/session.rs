//! Sync session state machine
//!
//! `idle --start--> running --complete--> completed --start--> running`, and
//! `reset` from anywhere back to idle. Only one run may be active at a time.

use admirror_api::SessionSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Clone)]
struct SessionData {
    state: SessionState,
    progress_percent: u8,
    current_phase_key: String,
    status_message: String,
    errors: Vec<String>,
    last_completed_at: Option<DateTime<Utc>>,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            progress_percent: 0,
            current_phase_key: String::new(),
            status_message: String::new(),
            errors: Vec::new(),
            last_completed_at: None,
        }
    }
}

/// Process-wide sync state, owned explicitly and shared via `Arc`
#[derive(Debug, Default)]
pub struct SyncSession {
    data: RwLock<SessionData>,
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle session seeded with a previously persisted completion time
    pub fn with_last_completed(last_completed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            data: RwLock::new(SessionData {
                last_completed_at,
                ..SessionData::default()
            }),
        }
    }

    /// Rejected without touching state while a run is active
    pub async fn start_sync(&self) -> Result<(), SyncError> {
        let mut data = self.data.write().await;
        if data.state == SessionState::Running {
            warn!("[SyncSession] start_sync rejected: a sync is already running");
            return Err(SyncError::AlreadyRunning);
        }

        data.state = SessionState::Running;
        data.progress_percent = 0;
        data.errors.clear();
        data.current_phase_key.clear();
        data.status_message = "Starting sync".to_string();
        info!("[SyncSession] Sync started");
        Ok(())
    }

    pub async fn update_phase(&self, phase_key: &str, message: &str) {
        let mut data = self.data.write().await;
        if data.state != SessionState::Running {
            warn!(
                "[SyncSession] Ignoring phase update '{}' outside a running sync",
                phase_key
            );
            return;
        }
        data.current_phase_key = phase_key.to_string();
        data.status_message = message.to_string();
    }

    pub async fn set_progress(&self, percent: u8) {
        let mut data = self.data.write().await;
        if data.state == SessionState::Running {
            data.progress_percent = percent.min(100);
        }
    }

    pub async fn record_error(&self, error: impl Into<String>) {
        let mut data = self.data.write().await;
        if data.state == SessionState::Running {
            data.errors.push(error.into());
        }
    }

    /// Finishes the active run; returns the completion stamp, or `None` if nothing was running
    pub async fn complete_sync(&self, success: bool) -> Option<DateTime<Utc>> {
        let mut data = self.data.write().await;
        if data.state != SessionState::Running {
            warn!("[SyncSession] complete_sync called without a running sync");
            return None;
        }

        let now = Utc::now();
        data.state = SessionState::Completed;
        data.progress_percent = 100;
        data.last_completed_at = Some(now);
        data.status_message = if success {
            "Sync completed".to_string()
        } else {
            "Sync completed with errors".to_string()
        };
        info!(
            "[SyncSession] Sync completed (success={}, errors={})",
            success,
            data.errors.len()
        );
        Some(now)
    }

    /// Ends a run that could not start; keeps `last_completed_at`
    pub async fn abort_sync(&self, message: impl Into<String>) {
        let mut data = self.data.write().await;
        let message = message.into();
        data.state = SessionState::Idle;
        data.progress_percent = 0;
        data.current_phase_key.clear();
        data.status_message = message.clone();
        data.errors.push(message);
    }

    /// Back to idle with all defaults, including `last_completed_at`
    pub async fn reset_sync(&self) {
        *self.data.write().await = SessionData::default();
        info!("[SyncSession] Session reset");
    }

    /// Like `reset_sync`, but refused while a run is active
    pub async fn try_reset(&self) -> Result<(), SyncError> {
        let mut data = self.data.write().await;
        if data.state == SessionState::Running {
            warn!("[SyncSession] reset rejected: a sync is running");
            return Err(SyncError::AlreadyRunning);
        }
        *data = SessionData::default();
        info!("[SyncSession] Session reset");
        Ok(())
    }

    pub async fn state(&self) -> SessionState {
        self.data.read().await.state
    }

    pub async fn is_active(&self) -> bool {
        self.state().await == SessionState::Running
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let data = self.data.read().await;
        SessionSnapshot {
            is_active: data.state == SessionState::Running,
            progress_percent: data.progress_percent,
            current_phase_key: data.current_phase_key.clone(),
            status_message: data.status_message.clone(),
            errors: data.errors.clone(),
            last_completed_at: data.last_completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_resets_errors_and_progress() {
        let session = SyncSession::new();
        session.start_sync().await.unwrap();
        session.record_error("zones: HTTP 500").await;
        session.set_progress(57).await;
        session.complete_sync(false).await;

        session.start_sync().await.unwrap();
        let snapshot = session.snapshot().await;
        assert!(snapshot.is_active);
        assert_eq!(snapshot.progress_percent, 0);
        assert!(snapshot.errors.is_empty());
        assert!(snapshot.last_completed_at.is_some());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_without_side_effects() {
        let session = SyncSession::new();
        session.start_sync().await.unwrap();
        session.update_phase("zones", "Syncing zones").await;
        session.record_error("networks: timeout").await;
        let before = session.snapshot().await;

        let second = session.start_sync().await;
        assert!(matches!(second, Err(SyncError::AlreadyRunning)));
        assert_eq!(session.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_complete_stamps_and_deactivates() {
        let session = SyncSession::new();
        session.start_sync().await.unwrap();
        let stamp = session.complete_sync(true).await;

        let snapshot = session.snapshot().await;
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.progress_percent, 100);
        assert_eq!(snapshot.last_completed_at, stamp);
        assert_eq!(session.state().await, SessionState::Completed);
    }

    #[tokio::test]
    async fn test_reset_clears_last_completed() {
        let session = SyncSession::new();
        session.start_sync().await.unwrap();
        session.complete_sync(true).await;
        session.reset_sync().await;

        let snapshot = session.snapshot().await;
        assert_eq!(session.state().await, SessionState::Idle);
        assert_eq!(snapshot.last_completed_at, None);
        assert_eq!(snapshot.progress_percent, 0);
    }

    #[tokio::test]
    async fn test_try_reset_refuses_a_running_session() {
        let session = SyncSession::new();
        session.start_sync().await.unwrap();
        session.update_phase("zones", "Syncing zones").await;
        let before = session.snapshot().await;

        assert!(matches!(
            session.try_reset().await,
            Err(SyncError::AlreadyRunning)
        ));
        assert_eq!(session.snapshot().await, before);

        session.complete_sync(true).await;
        session.try_reset().await.unwrap();
        assert_eq!(session.state().await, SessionState::Idle);
        assert_eq!(session.snapshot().await.last_completed_at, None);
    }

    #[tokio::test]
    async fn test_abort_keeps_last_completed() {
        let stamp = Utc::now();
        let session = SyncSession::with_last_completed(Some(stamp));
        session.start_sync().await.unwrap();
        session.abort_sync("cannot build client").await;

        let snapshot = session.snapshot().await;
        assert!(!snapshot.is_active);
        assert_eq!(session.state().await, SessionState::Idle);
        assert_eq!(snapshot.last_completed_at, Some(stamp));
        assert_eq!(snapshot.errors, vec!["cannot build client".to_string()]);
    }

    #[tokio::test]
    async fn test_updates_outside_a_run_are_ignored() {
        let session = SyncSession::new();
        session.update_phase("zones", "Syncing zones").await;
        session.record_error("stray").await;
        assert_eq!(session.complete_sync(true).await, None);

        let snapshot = session.snapshot().await;
        assert!(snapshot.current_phase_key.is_empty());
        assert!(snapshot.errors.is_empty());
    }
}
