//! User settings, loaded from and saved as TOML.

use crate::session::types::{SessionError, SpeedBounds};
use crate::zones::{self, ZoneSelection};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not resolve a platform config directory
    #[error("no config directory available")]
    NoConfigDir,

    /// Filesystem error
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file did not parse
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be serialized
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Settings violate a controller invariant
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Persisted user settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Rider age, used for the max heart rate formula
    pub age: u16,
    /// Belt speed envelope
    pub speed_bounds: SpeedBounds,
    /// Last selected target zone or custom range
    pub zone_selection: Option<ZoneSelection>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            age: 30,
            speed_bounds: SpeedBounds::default(),
            zone_selection: None,
            updated_at: Utc::now(),
        }
    }
}

impl Settings {
    /// Validate through the same invariants the controller enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_hr =
            zones::max_heart_rate(self.age).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.speed_bounds
            .validate()
            .map_err(|e: SessionError| ConfigError::Invalid(e.to_string()))?;
        if let Some(selection) = self.zone_selection {
            zones::target_bounds(selection, max_hr)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    /// Default settings file location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", "zonerun").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("settings.toml"))
    }

    /// Load settings from the default location, falling back to defaults
    /// when no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        settings.validate()?;

        tracing::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Save settings to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    /// Save settings to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        tracing::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(settings.age, 30);
        assert_eq!(settings.speed_bounds, SpeedBounds::default());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.age = 42;
        settings.zone_selection = Some(ZoneSelection::NamedZone(3));
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.age, 42);
        assert_eq!(loaded.zone_selection, Some(ZoneSelection::NamedZone(3)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.age = 150;
        assert!(matches!(
            settings.save_to(&path),
            Err(ConfigError::Invalid(_))
        ));

        settings.age = 30;
        settings.speed_bounds.step_kmh = 0.0;
        assert!(settings.save_to(&path).is_err());
    }
}
