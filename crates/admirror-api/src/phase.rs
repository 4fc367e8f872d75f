use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ApiError, EntityKind};

/// One sequential stage of the sync pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKey {
    Cleanup,
    Networks,
    Advertisers,
    Zones,
    Campaigns,
    Advertisements,
    Placements,
}

impl PhaseKey {
    /// Fixed execution order: cleanup first, placements last
    pub const ORDER: [PhaseKey; 7] = [
        PhaseKey::Cleanup,
        PhaseKey::Networks,
        PhaseKey::Advertisers,
        PhaseKey::Zones,
        PhaseKey::Campaigns,
        PhaseKey::Advertisements,
        PhaseKey::Placements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKey::Cleanup => "cleanup",
            PhaseKey::Networks => "networks",
            PhaseKey::Advertisers => "advertisers",
            PhaseKey::Zones => "zones",
            PhaseKey::Campaigns => "campaigns",
            PhaseKey::Advertisements => "advertisements",
            PhaseKey::Placements => "placements",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PhaseKey::Cleanup => "Cleanup",
            PhaseKey::Networks => "Networks",
            PhaseKey::Advertisers => "Advertisers",
            PhaseKey::Zones => "Zones",
            PhaseKey::Campaigns => "Campaigns",
            PhaseKey::Advertisements => "Advertisements",
            PhaseKey::Placements => "Placements",
        }
    }

    /// Entity type fetched by this phase; `None` for cleanup
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            PhaseKey::Cleanup => None,
            PhaseKey::Networks => Some(EntityKind::Network),
            PhaseKey::Advertisers => Some(EntityKind::Advertiser),
            PhaseKey::Zones => Some(EntityKind::Zone),
            PhaseKey::Campaigns => Some(EntityKind::Campaign),
            PhaseKey::Advertisements => Some(EntityKind::Advertisement),
            PhaseKey::Placements => Some(EntityKind::Placement),
        }
    }
}

impl fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseKey {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseKey::ORDER
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ApiError::UnknownPhase { key: s.to_string() })
    }
}

impl From<EntityKind> for PhaseKey {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Network => PhaseKey::Networks,
            EntityKind::Advertiser => PhaseKey::Advertisers,
            EntityKind::Zone => PhaseKey::Zones,
            EntityKind::Campaign => PhaseKey::Campaigns,
            EntityKind::Advertisement => PhaseKey::Advertisements,
            EntityKind::Placement => PhaseKey::Placements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Outcome of a single phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResult {
    pub key: PhaseKey,
    pub display_name: String,
    pub status: PhaseStatus,
    /// Records written (or removed, for cleanup)
    pub count: usize,
    /// Records excluded by validation
    #[serde(default)]
    pub rejected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhaseResult {
    pub fn pending(key: PhaseKey) -> Self {
        Self {
            key,
            display_name: key.display_name().to_string(),
            status: PhaseStatus::Pending,
            count: 0,
            rejected: 0,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = PhaseStatus::InProgress;
    }

    pub fn complete(&mut self, count: usize, rejected: usize) {
        self.status = PhaseStatus::Completed;
        self.count = count;
        self.rejected = rejected;
        self.error = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = PhaseStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn is_failed(&self) -> bool {
        self.status == PhaseStatus::Failed
    }
}
