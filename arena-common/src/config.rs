//! Configuration loading for the Arena engine
//!
//! Resolution follows the priority order used across the platform's
//! services:
//! 1. Explicit override from the composition root (highest priority)
//! 2. Environment variables (`ARENA_*`)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration resolved at startup
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    /// Base URL of the debate service (create/stream/replay/minds endpoints)
    pub api_base_url: String,
    /// Bound on the debate creation request
    pub create_timeout_secs: u64,
    /// Bound on opening the stream connection
    pub connect_timeout_secs: u64,
    /// Bound on plain request/response calls (directory, replay)
    pub request_timeout_secs: u64,
    /// Capacity of the per-session event channel
    pub event_channel_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5740".to_string(),
            create_timeout_secs: 10,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            event_channel_capacity: 64,
        }
    }
}

/// Optional-field mirror of [`ArenaConfig`] for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_base_url: Option<String>,
    create_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    event_channel_capacity: Option<usize>,
}

impl ArenaConfig {
    /// Resolve the configuration following the 4-tier priority order.
    ///
    /// `base_url_override` is the composition root's explicit choice and
    /// wins over every other source when present.
    pub fn resolve(base_url_override: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // Priority 3: TOML config file
        if let Some(path) = find_config_file() {
            tracing::debug!("loading config file {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            config.overlay_toml(&content)?;
        }

        // Priority 2: environment variables
        if let Ok(url) = std::env::var("ARENA_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(secs) = env_u64("ARENA_CREATE_TIMEOUT_SECS")? {
            config.create_timeout_secs = secs;
        }
        if let Some(secs) = env_u64("ARENA_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout_secs = secs;
        }
        if let Some(secs) = env_u64("ARENA_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }

        // Priority 1: explicit override
        if let Some(url) = base_url_override {
            config.api_base_url = url.to_string();
        }

        config.validate()?;
        tracing::info!("arena config resolved: base url {}", config.api_base_url);
        Ok(config)
    }

    /// Apply a TOML document on top of the current values
    fn overlay_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid config file: {}", e)))?;

        if let Some(url) = file.api_base_url {
            self.api_base_url = url;
        }
        if let Some(secs) = file.create_timeout_secs {
            self.create_timeout_secs = secs;
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(capacity) = file.event_channel_capacity {
            self.event_channel_capacity = capacity;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Config(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL with any trailing slash trimmed, for joining paths
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be an integer, got {:?}", name, value))),
        Err(_) => Ok(None),
    }
}

/// Locate the config file for the platform.
///
/// Linux checks `~/.config/arena/config.toml` then
/// `/etc/arena/config.toml`; other platforms use the user config
/// directory only.
fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("arena").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }
    if cfg!(target_os = "linux") {
        let system = PathBuf::from("/etc/arena/config.toml");
        if system.exists() {
            return Some(system);
        }
    }
    None
}
