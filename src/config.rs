//! Client configuration: backend base URL, data directory, HTTP timeout.
//!
//! Values come from an optional TOML file (PREPDECK_CONFIG_PATH) overridden
//! by individual environment variables. Parse and IO errors are logged and
//! the defaults win; configuration can never make the client unusable.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::entitlement::FREE_QUESTION_LIMIT;

fn default_api_url() -> String {
    "http://localhost:3000".into()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_free_limit() -> u32 {
    FREE_QUESTION_LIMIT
}

#[derive(Clone, Debug, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend; trailing slashes are tolerated.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Directory for persisted client blobs (filters, onboarding, progress).
    /// Defaults to `~/.prepdeck`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Free allowance shown before the first dashboard fetch; the server's
    /// value takes over once totals arrive. Seeds the store's entitlement
    /// state via `AppStore::with_config`.
    #[serde(default = "default_free_limit")]
    pub free_question_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            data_dir: None,
            http_timeout_secs: default_timeout_secs(),
            free_question_limit: default_free_limit(),
        }
    }
}

impl ClientConfig {
    /// Resolved data directory, falling back to `~/.prepdeck`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".prepdeck")
        })
    }
}

/// Load configuration: TOML file first (if PREPDECK_CONFIG_PATH is set and
/// parses), then per-field env overrides.
pub fn load_config_from_env() -> ClientConfig {
    let mut cfg = load_toml_config().unwrap_or_default();

    if let Ok(url) = std::env::var("PREPDECK_API_URL") {
        if !url.is_empty() {
            cfg.api_url = url;
        }
    }
    if let Ok(dir) = std::env::var("PREPDECK_DATA_DIR") {
        if !dir.is_empty() {
            cfg.data_dir = Some(PathBuf::from(dir));
        }
    }
    if let Some(secs) = std::env::var("PREPDECK_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
    {
        cfg.http_timeout_secs = secs;
    }

    cfg
}

fn load_toml_config() -> Option<ClientConfig> {
    let path = std::env::var("PREPDECK_CONFIG_PATH").ok()?;
    match std::fs::read_to_string(&path) {
        Ok(s) => match toml::from_str::<ClientConfig>(&s) {
            Ok(cfg) => {
                info!(target: "prepdeck", %path, "Loaded client config (TOML)");
                Some(cfg)
            }
            Err(e) => {
                error!(target: "prepdeck", %path, error = %e, "Failed to parse TOML config");
                None
            }
        },
        Err(e) => {
            error!(target: "prepdeck", %path, error = %e, "Failed to read TOML config file");
            None
        }
    }
}
