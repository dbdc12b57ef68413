// src/config.rs
//! Coordinator configuration with file-based storage

use crate::{
    error::{LocationError, Result},
    location::{RequestOptions, DEFAULT_HIGH_ACCURACY, DEFAULT_MAXIMUM_AGE_MS},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub connection_timeout_ms: u64,
    pub fresh_location_timeout_ms: u64,
    pub max_reconnect_attempts: u32,
    pub min_distance_m: f32,
    pub default_high_accuracy: bool,
    pub default_maximum_age_ms: i64,
    pub gpsd_host: String,
    pub gpsd_port: u16,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: 3000,
            fresh_location_timeout_ms: 30_000,
            max_reconnect_attempts: 1,
            min_distance_m: 200.0,
            default_high_accuracy: DEFAULT_HIGH_ACCURACY,
            default_maximum_age_ms: DEFAULT_MAXIMUM_AGE_MS,
            gpsd_host: "localhost".to_string(),
            gpsd_port: 2947,
        }
    }
}

impl CoordinatorConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn fresh_location_timeout(&self) -> Duration {
        Duration::from_millis(self.fresh_location_timeout_ms)
    }

    /// Options used when the host omits or garbles them.
    pub fn default_options(&self) -> RequestOptions {
        RequestOptions::new(self.default_high_accuracy, self.default_maximum_age_ms)
    }

    /// Load configuration from the user's config file, or defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LocationError::Config(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| LocationError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to the user's config file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| LocationError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("geolocation-coordinator")
            .join("config.json"))
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.gpsd_host = host;
        self.gpsd_port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.connection_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_reconnect_attempts, 1);
        assert_eq!(config.min_distance_m, 200.0);
        assert_eq!(config.default_options(), RequestOptions::new(true, 60_000));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"connection_timeout_ms": 500, "gpsd_port": 3000}"#).unwrap();
        assert_eq!(config.connection_timeout_ms, 500);
        assert_eq!(config.gpsd_port, 3000);
        assert_eq!(config.gpsd_host, "localhost");
        assert_eq!(config.fresh_location_timeout_ms, 30_000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("geolocation-config-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut config = CoordinatorConfig::default();
        config.update_gpsd("gps.local".to_string(), 2948);
        config.save_to(&path).unwrap();

        let loaded = CoordinatorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_file() {
        let dir = std::env::temp_dir().join(format!("geolocation-bad-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(CoordinatorConfig::load_from(&path), Err(LocationError::Config(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_under_a_file_is_io_error() {
        let dir = std::env::temp_dir().join(format!("geolocation-blocked-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let result = CoordinatorConfig::default().save_to(&blocker.join("config.json"));
        match result {
            Err(err @ LocationError::Io(_)) => {
                assert!(std::error::Error::source(&err).is_some());
            }
            other => panic!("expected an IO error, got {:?}", other),
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
