use thiserror::Error;

pub mod entity;
pub mod events;
pub mod phase;
pub mod response;

// Re-export entity types
pub use entity::{
    AdvertisementRecord, AdvertiserRecord, CampaignRecord, EntityKind, EntityRecord, Identity,
    LocalId, NetworkRecord, PlacementRecord, PlacementViolation, RemoteId, ZoneRecord,
};

// Re-export phase types
pub use phase::{PhaseKey, PhaseResult, PhaseStatus};

// Re-export event types
pub use events::{StepResult, SyncEvent};

// Re-export response types
pub use response::{PhaseOutcome, SessionSnapshot, SyncResponse};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Unknown entity type: {key}")]
    UnknownEntityType { key: String },

    #[error("Unknown phase: {key}")]
    UnknownPhase { key: String },

    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Serialization {
            message: e.to_string(),
        }
    }
}
