//! Entry points for both delivery modes
//!
//! `run_blocking` answers with one aggregate response when the run is over;
//! `run_streaming` hands back an event stream right away and runs the pipeline in a
//! background task. Both share the session guard, so only one run is ever active.

use admirror_api::{SessionSnapshot, SyncEvent, SyncResponse};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::emitter::{ProgressEmitter, SyncEventStream};
use crate::error::SyncError;
use crate::mirror::LocalMirror;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::sequencer::{PhaseSequencer, SyncReport};
use crate::session::SyncSession;
use crate::state_store::{PersistedSyncState, SyncStateStore};
use crate::upstream::{FetcherFactory, UpstreamFetcher};

pub struct SyncService {
    rate_limit: RateLimitConfig,
    session: Arc<SyncSession>,
    mirror: Arc<dyn LocalMirror>,
    fetchers: Arc<dyn FetcherFactory>,
    state_store: Arc<dyn SyncStateStore>,
}

impl SyncService {
    /// Seeds the session with the persisted completion stamp
    pub async fn new(
        rate_limit: RateLimitConfig,
        mirror: Arc<dyn LocalMirror>,
        fetchers: Arc<dyn FetcherFactory>,
        state_store: Arc<dyn SyncStateStore>,
    ) -> Result<Self, SyncError> {
        let persisted = state_store.load().await?;
        info!(
            "[SyncService] Loaded sync state: last_completed_at={:?}",
            persisted.last_completed_at
        );

        Ok(Self {
            rate_limit,
            session: Arc::new(SyncSession::with_last_completed(
                persisted.last_completed_at,
            )),
            mirror,
            fetchers,
            state_store,
        })
    }

    pub fn session(&self) -> Arc<SyncSession> {
        self.session.clone()
    }

    pub fn mirror(&self) -> Arc<dyn LocalMirror> {
        self.mirror.clone()
    }

    pub async fn status(&self) -> SessionSnapshot {
        self.session.snapshot().await
    }

    /// Clears the session, including the persisted completion stamp
    pub async fn reset(&self) -> Result<(), SyncError> {
        self.session.try_reset().await?;
        self.state_store
            .save(&PersistedSyncState::default())
            .await?;
        Ok(())
    }

    /// Runs the whole pipeline and answers once it is over.
    ///
    /// `Err(AlreadyRunning)` if another run is active. A run that cannot start answers
    /// `Ok` with `success = false`.
    pub async fn run_blocking(&self) -> Result<SyncResponse, SyncError> {
        self.session.start_sync().await?;

        let fetcher = match self.build_fetcher() {
            Ok(fetcher) => fetcher,
            Err(e) => {
                let message = e.to_string();
                error!("[SyncService] Sync could not start: {}", message);
                self.session.abort_sync(message.clone()).await;
                return Ok(SyncResponse::not_run(message));
            }
        };

        let sequencer = PhaseSequencer::new(
            self.mirror.clone(),
            fetcher,
            self.session.clone(),
            ProgressEmitter::disabled(),
        );
        let report = sequencer.run().await;
        persist(self.state_store.as_ref(), &report).await;

        Ok(SyncResponse::from_results(
            report.overall_success,
            &report.results,
        ))
    }

    /// Starts a run in the background and returns its event stream.
    ///
    /// The session is claimed before this returns, so a second call made right after gets
    /// `Err(AlreadyRunning)`. Dropping the stream does not stop the run. The stream ends
    /// after the run has persisted its completion stamp.
    pub async fn run_streaming(&self) -> Result<SyncEventStream, SyncError> {
        self.session.start_sync().await?;
        let (emitter, stream) = ProgressEmitter::channel();

        let fetcher = match self.build_fetcher() {
            Ok(fetcher) => fetcher,
            Err(e) => {
                let message = e.to_string();
                error!("[SyncService] Sync could not start: {}", message);
                self.session.abort_sync(message.clone()).await;
                emitter.emit(SyncEvent::Error { message });
                return Ok(stream);
            }
        };

        let sequencer = PhaseSequencer::new(
            self.mirror.clone(),
            fetcher,
            self.session.clone(),
            emitter,
        );
        let state_store = self.state_store.clone();
        tokio::spawn(async move {
            let report = sequencer.run().await;
            persist(state_store.as_ref(), &report).await;
        });

        Ok(stream)
    }

    /// One limiter per run, shared by every phase
    fn build_fetcher(&self) -> Result<Arc<dyn UpstreamFetcher>, SyncError> {
        let limiter = Arc::new(RateLimiter::new(self.rate_limit.clone())?);
        self.fetchers.build(limiter)
    }
}

async fn persist(store: &dyn SyncStateStore, report: &SyncReport) {
    let Some(completed_at) = report.completed_at else {
        return;
    };
    let state = PersistedSyncState {
        last_completed_at: Some(completed_at),
        last_overall_success: Some(report.overall_success),
    };
    if let Err(e) = store.save(&state).await {
        warn!("[SyncService] Failed to persist sync state: {}", e);
    }
}
