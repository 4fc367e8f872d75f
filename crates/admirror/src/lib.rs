//! Advertising platform mirror sync
//!
//! Pulls every collection from the upstream ad platform and merges it into a local mirror:
//!
//! - `rate_limit` - session-wide request spacing
//! - `upstream` - UpstreamFetcher trait (HTTP implementation in admirror-upstream)
//! - `fake` - StaticFetcher serving fixed collections
//! - `mirror` - LocalMirror trait and MemoryMirror
//! - `reconciler` - replace synced records, preserve local-only ones
//! - `sequencer` - fixed phase order with best-effort continuation
//! - `session` - single-flight session state machine
//! - `emitter` - progress events to one observer
//! - `service` - blocking and streaming entry points
//! - `config` / `state_store` - configuration and persisted completion stamp

pub mod config;
pub mod emitter;
pub mod error;
pub mod fake;
pub mod mirror;
pub mod rate_limit;
pub mod reconciler;
pub mod sequencer;
pub mod service;
pub mod session;
pub mod state_store;
pub mod upstream;

pub use config::SyncConfig;
pub use emitter::{ProgressEmitter, SyncEventStream};
pub use error::{FetchError, StorageError, SyncError};
pub use fake::{StaticDataset, StaticFetcher};
pub use mirror::{LocalMirror, MemoryMirror, ReplaceOutcome};
pub use rate_limit::{RateLimitConfig, RateLimitMetrics, RateLimiter};
pub use reconciler::{MergeSummary, Reconciler, Rejection};
pub use sequencer::{PhaseSequencer, SyncReport};
pub use service::SyncService;
pub use session::{SessionState, SyncSession};
pub use state_store::{FileSyncStateStore, MemorySyncStateStore, PersistedSyncState, SyncStateStore};
pub use upstream::{FetchContext, FetchProgress, FetcherFactory, NoProgress, UpstreamFetcher};
