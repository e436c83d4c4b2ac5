// Configuration management module
// Handles loading, saving, and validating configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How often to poll the player page, in seconds
    pub refresh_interval: u64,

    /// Seconds of playback before a track qualifies for a scrobble
    pub scrobble_threshold: u64,

    /// URL of the player page to observe
    pub page_url: String,

    /// Text cleanup configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Last.fm API configuration
    pub lastfm: LastFmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Enable text cleanup
    pub enabled: bool,

    /// Regex patterns removed from track/album/artist names, in order
    pub patterns: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: vec![
                r"\s*\[Explicit\]".to_string(),
                r"\s*\[Clean\]".to_string(),
                r"\s*\(Explicit\)".to_string(),
                r"\s*\(Clean\)".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastFmConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
}

fn default_api_url() -> String {
    "https://ws.audioscrobbler.com/2.0/".to_string()
}

fn default_auth_url() -> String {
    "https://www.last.fm/api/auth/".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: 2,
            scrobble_threshold: 30,
            page_url: "https://poolsuite.net/".to_string(),
            cleanup: CleanupConfig::default(),
            lastfm: LastFmConfig {
                // Intentionally public credentials shared by the open-source
                // Web Scrobbler project; the secret only signs requests, it
                // does not authenticate a user.
                api_key: "d9bb1870d3269646f740544d9def2c95".to_string(),
                api_secret: "2160733a567d4a1a69a73fad54c564b2".to_string(),
                api_url: default_api_url(),
                auth_url: default_auth_url(),
            },
        }
    }
}

impl Config {
    /// Get the path to the configuration file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;

        Ok(config_dir.join("poolsuite_scrobbler.conf"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load(config_path: &PathBuf) -> Result<Self> {
        if !config_path.exists() {
            log::info!("Config file not found, creating default at {:?}", config_path);
            let default_config = Self::default();
            default_config.save(config_path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, content).context("Failed to write config file")?;

        log::info!("Config saved to {:?}", config_path);

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval == 0 {
            anyhow::bail!("refresh_interval must be greater than 0");
        }

        if self.scrobble_threshold == 0 {
            anyhow::bail!("scrobble_threshold must be greater than 0");
        }

        if self.page_url.is_empty() {
            anyhow::bail!("page_url is required");
        }

        if self.lastfm.api_key.is_empty() {
            anyhow::bail!("Last.fm api_key is required");
        }
        if self.lastfm.api_secret.is_empty() {
            anyhow::bail!("Last.fm api_secret is required");
        }
        if self.lastfm.api_url.is_empty() {
            anyhow::bail!("Last.fm api_url is required");
        }
        if self.lastfm.auth_url.is_empty() {
            anyhow::bail!("Last.fm auth_url is required");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().expect("default config validates");
    }

    #[test]
    fn rejects_zero_intervals() {
        let mut config = Config::default();
        config.refresh_interval = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scrobble_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_credentials() {
        let mut config = Config::default();
        config.lastfm.api_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scrobbler.conf");

        let config = Config::default();
        config.save(&path).expect("save config");

        let loaded = Config::load(&path).expect("load config");
        assert_eq!(loaded.refresh_interval, config.refresh_interval);
        assert_eq!(loaded.lastfm.api_url, config.lastfm.api_url);
    }

    #[test]
    fn missing_optional_sections_use_defaults() {
        let minimal = r#"
            refresh_interval = 5
            scrobble_threshold = 30
            page_url = "https://poolsuite.net/"

            [lastfm]
            api_key = "key"
            api_secret = "secret"
        "#;

        let config: Config = toml::from_str(minimal).expect("parse minimal config");
        assert!(config.cleanup.enabled);
        assert_eq!(config.lastfm.api_url, default_api_url());
        assert_eq!(config.lastfm.auth_url, default_auth_url());
    }
}
