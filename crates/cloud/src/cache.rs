//! Local key-value cache: one JSON file per `{trip_id}_{kind}` key, plus the
//! trip index.

use std::{
    fs,
    path::{Path, PathBuf},
};

use engine::TripMeta;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::ResultCloud;

const INDEX_FILE: &str = "trips.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKind {
    Days,
    Expenses,
    PersonalExpenses,
    Participants,
    Rate,
    Config,
    Cloud,
    Synced,
}

impl CacheKind {
    pub const ALL: [CacheKind; 8] = [
        CacheKind::Days,
        CacheKind::Expenses,
        CacheKind::PersonalExpenses,
        CacheKind::Participants,
        CacheKind::Rate,
        CacheKind::Config,
        CacheKind::Cloud,
        CacheKind::Synced,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Expenses => "exp",
            Self::PersonalExpenses => "personal_exp",
            Self::Participants => "users",
            Self::Rate => "rate",
            Self::Config => "config",
            Self::Cloud => "cloud",
            Self::Synced => "synced",
        }
    }
}

/// The trip list and the last trip the user worked on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripIndex {
    pub trips: Vec<TripMeta>,
    #[serde(default)]
    pub last_selected: Option<String>,
}

impl TripIndex {
    pub fn get(&self, trip_id: &str) -> Option<&TripMeta> {
        self.trips.iter().find(|trip| trip.id == trip_id)
    }

    pub fn get_mut(&mut self, trip_id: &str) -> Option<&mut TripMeta> {
        self.trips.iter_mut().find(|trip| trip.id == trip_id)
    }

    /// Insert or replace the entry with the same id.
    pub fn upsert(&mut self, meta: TripMeta) {
        match self.get_mut(&meta.id) {
            Some(existing) => *existing = meta,
            None => self.trips.push(meta),
        }
    }

    pub fn remove(&mut self, trip_id: &str) -> Option<TripMeta> {
        let index = self.trips.iter().position(|trip| trip.id == trip_id)?;
        if self.last_selected.as_deref() == Some(trip_id) {
            self.last_selected = None;
        }
        Some(self.trips.remove(index))
    }
}

#[derive(Clone, Debug)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, trip_id: &str, kind: CacheKind) -> PathBuf {
        self.dir.join(format!("{trip_id}_{}.json", kind.suffix()))
    }

    /// `None` when nothing was stored under the key yet.
    pub fn load<T: DeserializeOwned>(
        &self,
        trip_id: &str,
        kind: CacheKind,
    ) -> ResultCloud<Option<T>> {
        read_json(&self.path(trip_id, kind))
    }

    pub fn save<T: Serialize + ?Sized>(
        &self,
        trip_id: &str,
        kind: CacheKind,
        value: &T,
    ) -> ResultCloud<()> {
        write_json(&self.path(trip_id, kind), value)
    }

    pub fn remove(&self, trip_id: &str, kind: CacheKind) -> ResultCloud<()> {
        match fs::remove_file(self.path(trip_id, kind)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Forget every key of a trip.
    pub fn remove_trip(&self, trip_id: &str) -> ResultCloud<()> {
        for kind in CacheKind::ALL {
            self.remove(trip_id, kind)?;
        }
        Ok(())
    }

    pub fn load_index(&self) -> ResultCloud<TripIndex> {
        Ok(read_json(&self.dir.join(INDEX_FILE))?.unwrap_or_default())
    }

    pub fn save_index(&self, index: &TripIndex) -> ResultCloud<()> {
        write_json(&self.dir.join(INDEX_FILE), index)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ResultCloud<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ResultCloud<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(value)?;
    fs::write(path, payload)?;
    Ok(())
}
