//! Trip bookkeeping records: the entry shown in the trip list and the link to
//! a cloud copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{InviteCode, TripConfig};

/// Trip list entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMeta {
    /// Local identifier, also the prefix of every cache key of the trip.
    pub id: String,
    pub destination: String,
    pub start_date: String,
    pub days_count: u32,
    #[serde(default)]
    pub is_cloud_trip: bool,
}

impl TripMeta {
    pub fn new(config: &TripConfig) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            destination: config.display_title().to_string(),
            start_date: config.start_date.clone(),
            days_count: config.days,
            is_cloud_trip: false,
        }
    }
}

/// Where the cloud copy of a trip lives.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudLink {
    pub cloud_trip_id: Option<String>,
    #[serde(default)]
    pub invite_code: Option<InviteCode>,
    #[serde(default)]
    pub is_cloud_trip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CloudLink {
    pub fn linked(cloud_trip_id: &str, invite_code: InviteCode) -> Self {
        Self {
            cloud_trip_id: Some(cloud_trip_id.to_string()),
            invite_code: Some(invite_code),
            is_cloud_trip: true,
            last_synced_at: None,
        }
    }

    /// The remote trip id when the trip is actually synced with the cloud.
    pub fn active_trip_id(&self) -> Option<&str> {
        if !self.is_cloud_trip {
            return None;
        }
        self.cloud_trip_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_uses_display_title() {
        let meta = TripMeta::new(&TripConfig::default());
        assert_eq!(meta.destination, crate::itinerary::DEFAULT_TRIP_TITLE);
        assert!(!meta.id.is_empty());
        assert!(!meta.is_cloud_trip);
    }

    #[test]
    fn unlinked_trip_has_no_active_id() {
        let mut link = CloudLink {
            cloud_trip_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(link.active_trip_id(), None);
        link.is_cloud_trip = true;
        assert_eq!(link.active_trip_id(), Some("abc"));
    }
}
