//! User preference management with XDG Base Directory compliance.
//!
//! Settings live in `$XDG_CONFIG_HOME/musicora/settings.json`; the music
//! directory, playlist catalog and album art default to locations under
//! `$XDG_DATA_HOME/musicora`.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

/// Application directory name under the XDG base directories.
const APP_DIR: &str = "musicora";

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable user settings structure with default values.
///
/// Missing fields in an existing file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Directory scanned for the "All Songs" playlist.
    pub music_dir: PathBuf,
    /// Playlist catalog document.
    pub library_file: PathBuf,
    /// Directory holding `<track name>.jpg` cover images.
    pub album_art_dir: PathBuf,
    /// Volume of a fresh session (0.0-1.0).
    pub default_volume: f32,
    /// End-of-track check interval in milliseconds.
    pub monitor_interval_ms: u64,
    /// Progress display refresh interval in milliseconds.
    pub timeline_refresh_ms: u64,
    /// File extensions treated as audio when scanning.
    pub audio_extensions: Vec<String>,
    /// Sample capacity of the playback ring buffer (power of two).
    pub ring_buffer_size: usize,
}

impl Default for UserSettings {
    fn default() -> Self {
        let data_dir = get_data_dir();
        Self {
            music_dir: data_dir.join("music"),
            library_file: data_dir.join("library.json"),
            album_art_dir: data_dir.join("album_art"),
            default_volume: 0.7,
            monitor_interval_ms: 1000,
            timeline_refresh_ms: 500,
            audio_extensions: vec!["mp3".to_string()],
            ring_buffer_size: 16384,
        }
    }
}

impl UserSettings {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |reason: &str| {
            Err(SettingsError::InvalidValue {
                reason: reason.to_string(),
            })
        };

        if !(0.0..=1.0).contains(&self.default_volume) {
            return invalid("default_volume must be between 0.0 and 1.0");
        }
        if self.monitor_interval_ms == 0 {
            return invalid("monitor_interval_ms must be greater than 0");
        }
        if self.timeline_refresh_ms == 0 {
            return invalid("timeline_refresh_ms must be greater than 0");
        }
        if self.audio_extensions.is_empty() {
            return invalid("audio_extensions must not be empty");
        }
        if !self.ring_buffer_size.is_power_of_two() {
            return invalid("ring_buffer_size must be a power of two");
        }
        Ok(())
    }
}

/// Handles loading, saving, and validation of user preferences.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe user settings storage.
    settings: RwLock<UserSettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path.
    ///
    /// A missing file is created with default settings.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Custom path for the settings file
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded or written, or if
    /// the stored values are out of range.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let existing = config_path.exists();
        let settings: UserSettings = if existing {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("Creating new default settings file: {:?}", config_path);
            UserSettings::default()
        };
        settings.validate()?;

        let manager = SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        };
        if !existing {
            manager.save_settings()?;
        }
        Ok(manager)
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    fn save_settings(&self) -> Result<(), SettingsError> {
        debug!("Saving settings to file: {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Path of the settings file.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_home("XDG_CONFIG_HOME", ".config");
    config_dir.push(APP_DIR);
    config_dir.push("settings.json");
    config_dir
}

/// Directory for the music library, catalog and album art.
#[must_use]
pub fn get_data_dir() -> PathBuf {
    let mut data_dir = get_xdg_home("XDG_DATA_HOME", ".local/share");
    data_dir.push(APP_DIR);
    data_dir
}

/// Resolves an XDG base directory.
///
/// Uses the environment variable if set and non-empty, otherwise
/// `$HOME/<fallback>`.
fn get_xdg_home(variable: &str, fallback: &str) -> PathBuf {
    if let Ok(dir) = var(variable)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(fallback);
        return path;
    }

    PathBuf::from(".")
}
