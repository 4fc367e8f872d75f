//! Phase sequencer
//!
//! Runs `cleanup → networks → advertisers → zones → campaigns → advertisements → placements`
//! strictly one after the other. A failing phase is recorded and the run moves on to the
//! next one; only `complete` ends the event stream.

use admirror_api::{EntityKind, Identity, PhaseKey, PhaseResult, StepResult, SyncEvent};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::emitter::ProgressEmitter;
use crate::mirror::LocalMirror;
use crate::reconciler::Reconciler;
use crate::session::SyncSession;
use crate::upstream::{FetchContext, UpstreamFetcher};

/// Aggregate outcome of a run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub overall_success: bool,
    pub results: Vec<PhaseResult>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn result(&self, key: PhaseKey) -> Option<&PhaseResult> {
        self.results.iter().find(|r| r.key == key)
    }
}

#[derive(Debug)]
struct PhaseCounts {
    count: usize,
    rejected: usize,
}

#[derive(Debug)]
struct PhaseFailure {
    message: String,
    rejected: usize,
}

impl From<String> for PhaseFailure {
    fn from(message: String) -> Self {
        Self {
            message,
            rejected: 0,
        }
    }
}

/// Percentage of `done` out of `total` phases
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((100 * done.min(total)) / total) as u8
}

/// Advisory remaining time from the average duration of the phases run so far.
/// `None` before any phase has finished.
pub fn estimate_seconds_remaining(
    elapsed: Duration,
    completed_steps: usize,
    total_steps: usize,
) -> Option<u64> {
    if completed_steps == 0 {
        return None;
    }
    let remaining = total_steps.saturating_sub(completed_steps) as u128;
    let remaining_ms = elapsed.as_millis() * remaining / completed_steps as u128;
    Some((remaining_ms / 1000) as u64)
}

fn step_message(key: PhaseKey) -> String {
    match key {
        PhaseKey::Cleanup => "Removing stale synced records".to_string(),
        other => format!("Syncing {}", other.as_str()),
    }
}

pub struct PhaseSequencer {
    mirror: Arc<dyn LocalMirror>,
    fetcher: Arc<dyn UpstreamFetcher>,
    reconciler: Reconciler,
    session: Arc<SyncSession>,
    emitter: ProgressEmitter,
}

impl PhaseSequencer {
    pub fn new(
        mirror: Arc<dyn LocalMirror>,
        fetcher: Arc<dyn UpstreamFetcher>,
        session: Arc<SyncSession>,
        emitter: ProgressEmitter,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(mirror.clone()),
            mirror,
            fetcher,
            session,
            emitter,
        }
    }

    /// Runs every phase; the session must already have been started
    #[tracing::instrument(name = "sync.run", skip(self), fields(fetcher = self.fetcher.fetcher_name()))]
    pub async fn run(&self) -> SyncReport {
        let started = Instant::now();
        let phases = PhaseKey::ORDER;
        let total = phases.len();
        let mut results: Vec<PhaseResult> =
            phases.iter().map(|key| PhaseResult::pending(*key)).collect();

        self.emitter.emit(SyncEvent::Status {
            phase: "starting".to_string(),
            message: format!("Starting sync of {} phases", total),
            progress: 0,
        });

        for (index, key) in phases.into_iter().enumerate() {
            let progress = progress_percent(index, total);
            let message = step_message(key);

            results[index].start();
            self.session.update_phase(key.as_str(), &message).await;
            self.emitter.emit(SyncEvent::StepStart {
                phase: key,
                message,
                progress,
                current_step: index + 1,
                total_steps: total,
                estimated_seconds_remaining: estimate_seconds_remaining(
                    started.elapsed(),
                    index,
                    total,
                ),
            });

            match self.run_phase(key, progress).await {
                Ok(counts) => {
                    results[index].complete(counts.count, counts.rejected);
                    let message = if counts.rejected > 0 {
                        format!(
                            "{}: {} synced, {} rejected",
                            key.display_name(),
                            counts.count,
                            counts.rejected
                        )
                    } else {
                        format!("{}: {} synced", key.display_name(), counts.count)
                    };
                    self.emitter.emit(SyncEvent::StepComplete {
                        phase: key,
                        message,
                        progress: progress_percent(index + 1, total),
                        step_result: StepResult::count(counts.count),
                    });
                }
                Err(failure) => {
                    warn!(
                        "[PhaseSequencer] Phase {} failed, continuing: {}",
                        key, failure.message
                    );
                    results[index].fail(failure.message.clone());
                    results[index].rejected = failure.rejected;
                    self.session
                        .record_error(format!("{}: {}", key.display_name(), failure.message))
                        .await;
                    self.emitter.emit(SyncEvent::StepError {
                        phase: key,
                        message: format!("{} failed", key.display_name()),
                        progress: progress_percent(index + 1, total),
                        step_result: StepResult::error(failure.message),
                    });
                }
            }

            self.session
                .set_progress(progress_percent(index + 1, total))
                .await;
        }

        let overall_success = !results.iter().any(|r| r.is_failed());
        let completed_at = self.session.complete_sync(overall_success).await;
        let failed = results.iter().filter(|r| r.is_failed()).count();
        let message = if overall_success {
            "Sync completed successfully".to_string()
        } else {
            format!("Sync completed with {} failed phase(s)", failed)
        };

        info!(
            "[PhaseSequencer] {} in {}ms",
            message,
            started.elapsed().as_millis()
        );
        self.emitter.emit(SyncEvent::Complete {
            message,
            overall_success,
            results: results.clone(),
        });

        SyncReport {
            overall_success,
            results,
            completed_at,
        }
    }

    #[tracing::instrument(name = "sync.phase", skip(self, progress))]
    async fn run_phase(&self, key: PhaseKey, progress: u8) -> Result<PhaseCounts, PhaseFailure> {
        let Some(kind) = key.entity_kind() else {
            let removed = self
                .mirror
                .purge_synced()
                .await
                .map_err(|e| format!("cleanup failed: {}", e))?;
            return Ok(PhaseCounts {
                count: removed,
                rejected: 0,
            });
        };

        let campaign_ids = if kind == EntityKind::Placement {
            self.mirror
                .list(EntityKind::Campaign)
                .await
                .map_err(|e| format!("cannot list campaigns: {}", e))?
                .iter()
                .filter_map(|c| c.remote_id())
                .collect()
        } else {
            Vec::new()
        };

        let sink = self.emitter.phase_progress(key, progress);
        let ctx = FetchContext::new(campaign_ids, &sink);
        let records = self
            .fetcher
            .fetch(kind, &ctx)
            .await
            .map_err(|e| e.to_string())?;
        let fetched = records.len();

        let summary = self
            .reconciler
            .reconcile(kind, records)
            .await
            .map_err(|e| e.to_string())?;

        if summary.all_rejected() {
            return Err(PhaseFailure {
                message: format!("all {} fetched {} failed validation", fetched, kind),
                rejected: summary.rejected,
            });
        }

        Ok(PhaseCounts {
            count: summary.written,
            rejected: summary.rejected,
        })
    }
}
