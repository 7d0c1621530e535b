//! User preferences and their on-disk location.
//!
//! This module provides user preference management with XDG Base Directory
//! compliance.

pub mod settings;

pub use settings::{SettingsError, SettingsManager, UserSettings, get_config_path, get_data_dir};
