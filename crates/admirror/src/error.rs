use admirror_api::EntityKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record has neither a remote nor a local id: {0}")]
    MissingIdentity(String),

    #[error("Record kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

/// Failure to retrieve one remote collection; scoped to a single phase
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to fetch {entity}: {message}")]
pub struct FetchError {
    pub entity: EntityKind,
    pub message: String,
}

impl FetchError {
    pub fn new(entity: EntityKind, message: impl Into<String>) -> Self {
        Self {
            entity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("A sync is already running")]
    AlreadyRunning,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to set up upstream client: {0}")]
    ClientSetup(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// HTTP status a web layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::AlreadyRunning => 409,
            SyncError::Config(_) | SyncError::ClientSetup(_) => 503,
            SyncError::Storage(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
