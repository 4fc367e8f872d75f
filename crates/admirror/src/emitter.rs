//! Outbound progress channel to a single observer
//!
//! Fire-and-forget: sends never wait, and a dropped receiver is not an error.

use admirror_api::{PhaseKey, SyncEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::upstream::FetchProgress;

/// Ordered stream of events for one run; ends after the terminal event
pub type SyncEventStream = UnboundedReceiverStream<SyncEvent>;

#[derive(Debug, Clone)]
pub struct ProgressEmitter {
    tx: Option<mpsc::UnboundedSender<SyncEvent>>,
    closed: Arc<AtomicBool>,
}

impl ProgressEmitter {
    pub fn channel() -> (Self, SyncEventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Self {
            tx: Some(tx),
            closed: Arc::new(AtomicBool::new(false)),
        };
        (emitter, UnboundedReceiverStream::new(rx))
    }

    /// Emitter without an observer (blocking mode)
    pub fn disabled() -> Self {
        Self {
            tx: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn emit(&self, event: SyncEvent) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(
                "[ProgressEmitter] Dropping {} after terminal event",
                event.event_type()
            );
            return;
        }
        if event.is_terminal() {
            self.closed.store(true, Ordering::SeqCst);
        }
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(event).is_err() {
            debug!("[ProgressEmitter] Observer disconnected, continuing without it");
        }
    }

    /// Sink for sub-progress inside `phase`
    pub fn phase_progress(&self, phase: PhaseKey, progress: u8) -> PhaseProgress {
        PhaseProgress {
            emitter: self.clone(),
            phase,
            progress,
        }
    }
}

/// Turns fetcher sub-progress into `step-progress` events
pub struct PhaseProgress {
    emitter: ProgressEmitter,
    phase: PhaseKey,
    progress: u8,
}

impl FetchProgress for PhaseProgress {
    fn report(&self, message: String, current: usize, total: Option<usize>) {
        self.emitter.emit(SyncEvent::StepProgress {
            phase: self.phase,
            message,
            progress: self.progress,
            current_count: current,
            total_campaigns: total,
        });
    }
}
