//! Mirrored advertising entities
//!
//! Every entity lives in two identity spaces at once:
//! - `remote_id`: assigned by the upstream platform, present iff the record exists upstream
//! - `local_id`: assigned at local creation time, kept after the record is first synced
//!
//! A record with only a `local_id` is local-only. A record with a `remote_id` is synced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ApiError;

/// Identifier assigned by the upstream platform
pub type RemoteId = i64;

/// Identifier assigned locally at creation time
pub type LocalId = String;

/// The six mirrored entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Network,
    Advertiser,
    Zone,
    Campaign,
    Advertisement,
    Placement,
}

impl EntityKind {
    /// All kinds in sync dependency order
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Network,
        EntityKind::Advertiser,
        EntityKind::Zone,
        EntityKind::Campaign,
        EntityKind::Advertisement,
        EntityKind::Placement,
    ];

    /// Collection key, e.g. "networks"
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Network => "networks",
            EntityKind::Advertiser => "advertisers",
            EntityKind::Zone => "zones",
            EntityKind::Campaign => "campaigns",
            EntityKind::Advertisement => "advertisements",
            EntityKind::Placement => "placements",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EntityKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| ApiError::UnknownEntityType { key: s.to_string() })
    }
}

/// Shared identity surface of all mirrored records
pub trait Identity {
    fn remote_id(&self) -> Option<RemoteId>;

    fn local_id(&self) -> Option<&str>;

    fn is_synced(&self) -> bool {
        self.remote_id().is_some()
    }

    fn is_local_only(&self) -> bool {
        self.remote_id().is_none() && self.local_id().is_some()
    }

    /// At least one of the two identifiers is set
    fn has_identity(&self) -> bool {
        self.remote_id().is_some() || self.local_id().is_some()
    }
}

fn new_local_id() -> LocalId {
    Uuid::new_v4().to_string()
}

macro_rules! impl_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identity for $ty {
                fn remote_id(&self) -> Option<RemoteId> {
                    self.remote_id
                }

                fn local_id(&self) -> Option<&str> {
                    self.local_id.as_deref()
                }
            }
        )*
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub remote_id: Option<RemoteId>,
    pub local_id: Option<LocalId>,
    pub name: String,
    pub web_home: Option<String>,
}

impl NetworkRecord {
    pub fn remote(remote_id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id),
            local_id: None,
            name: name.into(),
            web_home: None,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            local_id: Some(new_local_id()),
            name: name.into(),
            web_home: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertiserRecord {
    pub remote_id: Option<RemoteId>,
    pub local_id: Option<LocalId>,
    pub name: String,
    pub network_remote_id: Option<RemoteId>,
}

impl AdvertiserRecord {
    pub fn remote(remote_id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id),
            local_id: None,
            name: name.into(),
            network_remote_id: None,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            local_id: Some(new_local_id()),
            name: name.into(),
            network_remote_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    pub remote_id: Option<RemoteId>,
    pub local_id: Option<LocalId>,
    pub name: String,
    pub network_remote_id: Option<RemoteId>,
    pub alias: Option<String>,
}

impl ZoneRecord {
    pub fn remote(remote_id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id),
            local_id: None,
            name: name.into(),
            network_remote_id: None,
            alias: None,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            local_id: Some(new_local_id()),
            name: name.into(),
            network_remote_id: None,
            alias: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    pub remote_id: Option<RemoteId>,
    pub local_id: Option<LocalId>,
    pub name: String,
    pub advertiser_remote_id: Option<RemoteId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl CampaignRecord {
    pub fn remote(remote_id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id),
            local_id: None,
            name: name.into(),
            advertiser_remote_id: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            local_id: Some(new_local_id()),
            name: name.into(),
            advertiser_remote_id: None,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementRecord {
    pub remote_id: Option<RemoteId>,
    pub local_id: Option<LocalId>,
    pub name: String,
    pub advertiser_remote_id: Option<RemoteId>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub active_placement: bool,
}

impl AdvertisementRecord {
    pub fn remote(remote_id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id),
            local_id: None,
            name: name.into(),
            advertiser_remote_id: None,
            width: None,
            height: None,
            active_placement: false,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            local_id: Some(new_local_id()),
            name: name.into(),
            advertiser_remote_id: None,
            width: None,
            height: None,
            active_placement: false,
        }
    }
}

/// Placement of an advertisement into a zone for a campaign
///
/// The campaign and the zone may each be referenced through either identity space,
/// but through exactly one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRecord {
    pub remote_id: Option<RemoteId>,
    pub local_id: Option<LocalId>,
    pub advertisement_remote_id: Option<RemoteId>,
    pub campaign_remote_ref: Option<RemoteId>,
    pub campaign_local_ref: Option<LocalId>,
    pub zone_remote_ref: Option<RemoteId>,
    pub zone_local_ref: Option<LocalId>,
}

/// Why a placement failed its reference checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementViolation {
    CampaignRefBoth,
    CampaignRefMissing,
    ZoneRefBoth,
    ZoneRefMissing,
}

impl fmt::Display for PlacementViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PlacementViolation::CampaignRefBoth => "both campaign references are set",
            PlacementViolation::CampaignRefMissing => "no campaign reference is set",
            PlacementViolation::ZoneRefBoth => "both zone references are set",
            PlacementViolation::ZoneRefMissing => "no zone reference is set",
        };
        f.write_str(msg)
    }
}

impl PlacementRecord {
    /// A placement as reported by the upstream platform (remote references only)
    pub fn remote(
        remote_id: RemoteId,
        advertisement_remote_id: RemoteId,
        campaign_remote_ref: RemoteId,
        zone_remote_ref: RemoteId,
    ) -> Self {
        Self {
            remote_id: Some(remote_id),
            local_id: None,
            advertisement_remote_id: Some(advertisement_remote_id),
            campaign_remote_ref: Some(campaign_remote_ref),
            campaign_local_ref: None,
            zone_remote_ref: Some(zone_remote_ref),
            zone_local_ref: None,
        }
    }

    /// Checks the campaign and zone XOR references
    pub fn validate(&self) -> Result<(), PlacementViolation> {
        match (&self.campaign_remote_ref, &self.campaign_local_ref) {
            (Some(_), Some(_)) => return Err(PlacementViolation::CampaignRefBoth),
            (None, None) => return Err(PlacementViolation::CampaignRefMissing),
            _ => {}
        }
        match (&self.zone_remote_ref, &self.zone_local_ref) {
            (Some(_), Some(_)) => Err(PlacementViolation::ZoneRefBoth),
            (None, None) => Err(PlacementViolation::ZoneRefMissing),
            _ => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl_identity!(
    NetworkRecord,
    AdvertiserRecord,
    ZoneRecord,
    CampaignRecord,
    AdvertisementRecord,
    PlacementRecord,
);

/// Tagged union over all mirrored entity types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRecord {
    Network(NetworkRecord),
    Advertiser(AdvertiserRecord),
    Zone(ZoneRecord),
    Campaign(CampaignRecord),
    Advertisement(AdvertisementRecord),
    Placement(PlacementRecord),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Network(_) => EntityKind::Network,
            EntityRecord::Advertiser(_) => EntityKind::Advertiser,
            EntityRecord::Zone(_) => EntityKind::Zone,
            EntityRecord::Campaign(_) => EntityKind::Campaign,
            EntityRecord::Advertisement(_) => EntityKind::Advertisement,
            EntityRecord::Placement(_) => EntityKind::Placement,
        }
    }

    /// Display name; placements have none and are named by their remote id
    pub fn name(&self) -> String {
        match self {
            EntityRecord::Network(r) => r.name.clone(),
            EntityRecord::Advertiser(r) => r.name.clone(),
            EntityRecord::Zone(r) => r.name.clone(),
            EntityRecord::Campaign(r) => r.name.clone(),
            EntityRecord::Advertisement(r) => r.name.clone(),
            EntityRecord::Placement(r) => match r.remote_id {
                Some(id) => format!("placement {}", id),
                None => "placement".to_string(),
            },
        }
    }

    fn identity(&self) -> &dyn Identity {
        match self {
            EntityRecord::Network(r) => r,
            EntityRecord::Advertiser(r) => r,
            EntityRecord::Zone(r) => r,
            EntityRecord::Campaign(r) => r,
            EntityRecord::Advertisement(r) => r,
            EntityRecord::Placement(r) => r,
        }
    }
}

impl Identity for EntityRecord {
    fn remote_id(&self) -> Option<RemoteId> {
        self.identity().remote_id()
    }

    fn local_id(&self) -> Option<&str> {
        self.identity().local_id()
    }
}

macro_rules! impl_from_record {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for EntityRecord {
                fn from(record: $ty) -> Self {
                    EntityRecord::$variant(record)
                }
            }
        )*
    };
}

impl_from_record!(
    NetworkRecord => Network,
    AdvertiserRecord => Advertiser,
    ZoneRecord => Zone,
    CampaignRecord => Campaign,
    AdvertisementRecord => Advertisement,
    PlacementRecord => Placement,
);
