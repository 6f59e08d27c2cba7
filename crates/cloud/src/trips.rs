//! The trip list: creating, selecting, deleting and joining trips.

use std::{sync::Arc, time::Duration};

use engine::{CloudLink, InviteCode, Itinerary, Participants, TripConfig, TripMeta};
use tracing::info;

use crate::{
    CacheKind, CloudError, DocumentStore, LocalCache, ResultCloud, TripIndex, TripSession,
    session::TripState,
};

/// Create a local trip with a planned itinerary and select it.
pub fn create_trip(
    cache: &LocalCache,
    config: TripConfig,
    participants: Participants,
) -> ResultCloud<TripMeta> {
    let itinerary = Itinerary::plan(&config)?;
    let meta = TripMeta::new(&config);
    let state = TripState {
        meta: meta.clone(),
        config,
        itinerary,
        expenses: Vec::new(),
        personal_expenses: Vec::new(),
        participants,
        cloud: CloudLink::default(),
        synced: false,
    };
    state.save(cache)?;
    select_trip(cache, &meta.id)?;
    info!(trip = %meta.id, destination = %meta.destination, "trip created");
    Ok(meta)
}

pub fn list_trips(cache: &LocalCache) -> ResultCloud<TripIndex> {
    cache.load_index()
}

/// Remember `trip_id` as the trip to work on.
pub fn select_trip(cache: &LocalCache, trip_id: &str) -> ResultCloud<TripMeta> {
    let mut index = cache.load_index()?;
    let meta = index
        .get(trip_id)
        .cloned()
        .ok_or_else(|| CloudError::NotFound(format!("trip {trip_id}")))?;
    index.last_selected = Some(trip_id.to_string());
    cache.save_index(&index)?;
    Ok(meta)
}

/// The selected trip, falling back to the first one of the list.
pub fn current_trip(cache: &LocalCache) -> ResultCloud<Option<TripMeta>> {
    let index = cache.load_index()?;
    let selected = index
        .last_selected
        .as_deref()
        .and_then(|id| index.get(id))
        .or_else(|| index.trips.first());
    Ok(selected.cloned())
}

/// Forget a local trip. Its remote copy, if any, is left alone.
pub fn delete_trip(cache: &LocalCache, trip_id: &str) -> ResultCloud<TripMeta> {
    let mut index = cache.load_index()?;
    let meta = index
        .remove(trip_id)
        .ok_or_else(|| CloudError::NotFound(format!("trip {trip_id}")))?;
    cache.remove_trip(trip_id)?;
    cache.save_index(&index)?;
    info!(trip = %trip_id, "trip deleted");
    Ok(meta)
}

/// Join the remote trip using `code` and pull it.
///
/// A local trip already linked to the same remote trip is reused (with its
/// invite code refreshed); otherwise a new linked trip is created from the
/// remote document.
pub async fn join_trip(
    cache: &LocalCache,
    remote: Arc<dyn DocumentStore>,
    code: &InviteCode,
    debounce: Duration,
) -> ResultCloud<Arc<TripSession>> {
    let (remote_id, document) = remote
        .find_trip_by_invite_code(code)
        .await?
        .ok_or_else(|| CloudError::NotFound(format!("invite code {code}")))?;

    let index = cache.load_index()?;
    let mut existing = None;
    for meta in &index.trips {
        let link: Option<CloudLink> = cache.load(&meta.id, CacheKind::Cloud)?;
        if link.is_some_and(|link| link.active_trip_id() == Some(remote_id.as_str())) {
            existing = Some(meta.id.clone());
            break;
        }
    }

    let trip_id = match existing {
        Some(trip_id) => {
            let mut link: CloudLink = cache.load(&trip_id, CacheKind::Cloud)?.unwrap_or_default();
            link.invite_code = Some(code.clone());
            cache.save(&trip_id, CacheKind::Cloud, &link)?;
            info!(trip = %trip_id, remote = %remote_id, "joined trip already known locally");
            trip_id
        }
        None => {
            let mut config = TripConfig::default();
            document.apply_to(&mut config);
            let mut meta = TripMeta::new(&config);
            meta.is_cloud_trip = true;
            let state = TripState {
                meta: meta.clone(),
                config,
                itinerary: Itinerary::default(),
                expenses: Vec::new(),
                personal_expenses: Vec::new(),
                participants: document.participants(),
                cloud: CloudLink::linked(&remote_id, code.clone()),
                synced: false,
            };
            state.save(cache)?;
            info!(trip = %meta.id, remote = %remote_id, "joined trip");
            meta.id
        }
    };

    select_trip(cache, &trip_id)?;
    let session = TripSession::open(&trip_id, cache.clone(), remote, debounce)?;
    session.pull().await?;
    Ok(session)
}
