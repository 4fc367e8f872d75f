use admirror_api::{
    AdvertisementRecord, AdvertiserRecord, CampaignRecord, NetworkRecord, PlacementRecord,
    RemoteId, ZoneRecord,
};
use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated collection
#[derive(Debug, Deserialize)]
pub struct PagedResponse<T> {
    #[serde(alias = "items")]
    #[serde(alias = "results")]
    pub data: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> PagedResponse<T> {
    /// Cursor for the following page; an empty cursor means the collection is exhausted
    pub fn next(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkApiResponse {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub web_home: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertiserApiResponse {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub network_id: Option<RemoteId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneApiResponse {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub network_id: Option<RemoteId>,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignApiResponse {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub advertiser_id: Option<RemoteId>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertisementApiResponse {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub advertiser_id: Option<RemoteId>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub active_placement: bool,
}

/// Placement as listed under `/campaigns/{id}/placements`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementApiResponse {
    pub id: RemoteId,
    #[serde(default)]
    pub advertisement_id: Option<RemoteId>,
    /// Omitted by some API versions; the listing campaign is implied
    #[serde(default)]
    pub campaign_id: Option<RemoteId>,
    #[serde(default)]
    pub zone_id: Option<RemoteId>,
}

impl From<NetworkApiResponse> for NetworkRecord {
    fn from(api: NetworkApiResponse) -> Self {
        NetworkRecord {
            web_home: api.web_home,
            ..NetworkRecord::remote(api.id, api.name)
        }
    }
}

impl From<AdvertiserApiResponse> for AdvertiserRecord {
    fn from(api: AdvertiserApiResponse) -> Self {
        AdvertiserRecord {
            network_remote_id: api.network_id,
            ..AdvertiserRecord::remote(api.id, api.name)
        }
    }
}

impl From<ZoneApiResponse> for ZoneRecord {
    fn from(api: ZoneApiResponse) -> Self {
        ZoneRecord {
            network_remote_id: api.network_id,
            alias: api.alias,
            ..ZoneRecord::remote(api.id, api.name)
        }
    }
}

impl From<CampaignApiResponse> for CampaignRecord {
    fn from(api: CampaignApiResponse) -> Self {
        CampaignRecord {
            advertiser_remote_id: api.advertiser_id,
            start_date: api.start_date,
            end_date: api.end_date,
            ..CampaignRecord::remote(api.id, api.name)
        }
    }
}

impl From<AdvertisementApiResponse> for AdvertisementRecord {
    fn from(api: AdvertisementApiResponse) -> Self {
        AdvertisementRecord {
            advertiser_remote_id: api.advertiser_id,
            width: api.width,
            height: api.height,
            active_placement: api.active_placement,
            ..AdvertisementRecord::remote(api.id, api.name)
        }
    }
}

impl PlacementApiResponse {
    /// Upstream placements only ever carry remote references.
    /// A missing zone is kept as-is so the reconciler can reject it.
    pub fn into_record(self, listing_campaign: RemoteId) -> PlacementRecord {
        PlacementRecord {
            remote_id: Some(self.id),
            local_id: None,
            advertisement_remote_id: self.advertisement_id,
            campaign_remote_ref: Some(self.campaign_id.unwrap_or(listing_campaign)),
            campaign_local_ref: None,
            zone_remote_ref: self.zone_id,
            zone_local_ref: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_response_accepts_collection_aliases() {
        for field in ["data", "items", "results"] {
            let json = format!(r#"{{"{}": [{{"id": 1, "name": "n"}}], "next_cursor": "c2"}}"#, field);
            let page: PagedResponse<NetworkApiResponse> = serde_json::from_str(&json).unwrap();
            assert_eq!(page.data.len(), 1);
            assert_eq!(page.next(), Some("c2"));
        }

        let last: PagedResponse<NetworkApiResponse> =
            serde_json::from_str(r#"{"data": [], "next_cursor": ""}"#).unwrap();
        assert_eq!(last.next(), None);
    }

    #[test]
    fn test_placement_defaults_to_listing_campaign() {
        let api: PlacementApiResponse =
            serde_json::from_str(r#"{"id": 9, "advertisement_id": 5, "zone_id": 7}"#).unwrap();
        let record = api.into_record(300);
        assert_eq!(record.campaign_remote_ref, Some(300));
        assert_eq!(record.zone_remote_ref, Some(7));
        assert!(record.is_valid());
    }

    #[test]
    fn test_advertisement_conversion_keeps_creative_size() {
        let api: AdvertisementApiResponse = serde_json::from_str(
            r#"{"id": 5, "name": "Banner", "advertiser_id": 2, "width": 728, "height": 90}"#,
        )
        .unwrap();
        let record = AdvertisementRecord::from(api);
        assert_eq!(record.remote_id, Some(5));
        assert_eq!((record.width, record.height), (Some(728), Some(90)));
        assert!(!record.active_placement);
        assert_eq!(record.local_id, None);
    }
}
