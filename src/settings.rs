use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::APP_DIR_NAME;

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 45;

/// Display toggles and polling options read by the monitor once per cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub show_map: bool,
    #[serde(default = "default_true")]
    pub show_score: bool,
    /// Rating change after a finished match
    #[serde(default = "default_true")]
    pub show_elo: bool,
    #[serde(default = "default_true")]
    pub show_avg_elo: bool,
    #[serde(default = "default_true")]
    pub show_kda: bool,
    /// Extra cycles a finished match stays displayed once fully resolved
    #[serde(default)]
    pub finished_hold_cycles: u32,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            enabled: true,
            show_map: true,
            show_score: true,
            show_elo: true,
            show_avg_elo: true,
            show_kda: true,
            finished_hold_cycles: 0,
        }
    }
}

impl Settings {
    /// Base poll interval, never shorter than one second
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Read-only view of the current settings
pub trait SettingsProvider: Send + Sync {
    /// Must not block on I/O held by another thread
    fn snapshot(&self) -> Settings;
}

/// Settings held in memory only, changed through setters
#[derive(Debug, Default)]
pub struct MemorySettings {
    settings: RwLock<Settings>,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Settings {
        let mut settings = self.settings.write();
        f(&mut settings);
        settings.clone()
    }
}

impl SettingsProvider for MemorySettings {
    fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }
}

/// Identifies one version of the settings file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

fn file_stamp(path: &Path) -> Option<FileStamp> {
    let metadata = fs::metadata(path).ok()?;
    Some(FileStamp {
        modified: metadata.modified().ok(),
        len: metadata.len(),
    })
}

#[derive(Debug)]
struct Cached {
    settings: Settings,
    stamp: Option<FileStamp>,
}

/// Settings persisted as JSON, reloaded whenever the file changes on disk
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    cached: RwLock<Cached>,
}

pub fn get_settings_path() -> Result<PathBuf, String> {
    let config_dir = dirs::config_dir()
        .ok_or("Failed to get config directory")?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&config_dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;

    Ok(config_dir.join(SETTINGS_FILE))
}

pub fn load_settings(path: &Path) -> Settings {
    tracing::debug!("Loading settings from {}", path.display());

    if !path.exists() {
        return Settings::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read settings file, using defaults: {}", e);
            return Settings::default();
        }
    };

    if contents.trim().is_empty() {
        tracing::warn!("Settings file is empty, using defaults");
        return Settings::default();
    }

    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to parse settings file, using defaults: {}", e);
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), String> {
    tracing::debug!("Saving settings");

    let contents = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    fs::write(path, contents).map_err(|e| format!("Failed to write settings file: {}", e))
}

impl FileSettings {
    /// Open the settings file in the per-user config directory, writing the
    /// defaults there if it does not exist yet.
    pub fn open_default() -> Result<Self, String> {
        let path = get_settings_path()?;
        if !path.exists() {
            save_settings(&path, &Settings::default())?;
        }
        Ok(Self::open(path))
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stamp = file_stamp(&path);
        let settings = load_settings(&path);
        Self {
            path,
            cached: RwLock::new(Cached { settings, stamp }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply a change and persist it immediately
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Settings, String> {
        let mut cached = self.cached.write();
        let mut settings = cached.settings.clone();
        f(&mut settings);
        save_settings(&self.path, &settings)?;
        cached.stamp = file_stamp(&self.path);
        cached.settings = settings.clone();
        Ok(settings)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<Settings, String> {
        self.update(|s| s.enabled = enabled)
    }
}

impl SettingsProvider for FileSettings {
    fn snapshot(&self) -> Settings {
        let stamp = file_stamp(&self.path);
        {
            let cached = self.cached.read();
            if cached.stamp == stamp {
                return cached.settings.clone();
            }
        }

        let Some(mut cached) = self.cached.try_write() else {
            // Another reader is already reloading
            return self.cached.read().settings.clone();
        };
        tracing::info!("Settings file changed, reloading");
        cached.settings = load_settings(&self.path);
        cached.stamp = stamp;
        cached.settings.clone()
    }
}
