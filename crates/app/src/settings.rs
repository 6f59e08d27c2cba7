//! Settings for the `tripmate` binary.
//!
//! Sources, later ones winning: the TOML file (`config/tripmate.toml` unless
//! `--config` says otherwise, optional), `TRIPMATE_*` environment variables
//! (`TRIPMATE_REMOTE__DATABASE=memory`), then the command line overrides.

use std::{path::PathBuf, time::Duration};

use engine::Participants;
use serde::Deserialize;

use crate::{cli::GlobalArgs, error::Result};

const DEFAULT_CONFIG_PATH: &str = "config/tripmate.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub dir: PathBuf,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".tripmate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Remote {
    /// `memory` or the path of a SQLite file.
    pub database: String,
    /// Re-read watched collections this often, in milliseconds.
    pub poll_ms: Option<u64>,
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            database: "tripmate.db".to_string(),
            poll_ms: Some(1000),
        }
    }
}

impl Remote {
    pub fn database(&self) -> Database {
        match self.database.trim() {
            "memory" | ":memory:" => Database::Memory,
            path => Database::Sqlite(path.to_string()),
        }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub debounce_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { debounce_ms: 1000 }
    }
}

impl SyncSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TripDefaults {
    /// Comma-separated participants of new trips.
    pub participants: String,
}

impl Default for TripDefaults {
    fn default() -> Self {
        Self {
            participants: "Me, Buddy A".to_string(),
        }
    }
}

impl TripDefaults {
    pub fn participants(&self) -> Participants {
        Participants::new(self.participants.split(','))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub cache: Cache,
    pub remote: Remote,
    pub sync: SyncSettings,
    pub trip: TripDefaults,
}

impl Settings {
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::File::with_name(config_path).required(false));
        builder = builder.add_source(
            config::Environment::with_prefix("TRIPMATE")
                .prefix_separator("_")
                .separator("__"),
        );
        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply(args);
        Ok(settings)
    }

    fn apply(&mut self, args: &GlobalArgs) {
        if let Some(level) = &args.level {
            self.app.level = level.clone();
        }
        if let Some(dir) = &args.cache_dir {
            self.cache.dir = dir.clone();
        }
        if let Some(database) = &args.database {
            self.remote.database = database.clone();
        }
        if let Some(debounce_ms) = args.debounce_ms {
            self.sync.debounce_ms = debounce_ms;
        }
    }
}
