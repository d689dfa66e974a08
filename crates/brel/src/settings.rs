use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use brel_core::FetchSettings;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

const SETTINGS_DIR: &str = "brel";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_retry_delays")]
    pub retry_delays_secs: Vec<u64>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra majors to skip, keyed by preset id (`chrome_desktop`, ...).
    #[serde(default)]
    pub skipped_releases: BTreeMap<String, Vec<u32>>,
}

fn default_http_timeout() -> u64 {
    30
}

fn default_retry_delays() -> Vec<u64> {
    vec![0, 2, 5]
}

fn default_user_agent() -> String {
    format!("brel/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            retry_delays_secs: default_retry_delays(),
            user_agent: default_user_agent(),
            skipped_releases: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, or from the user config directory.
    ///
    /// A file named on the command line must exist and parse. The file in
    /// the config directory is optional and falls back to defaults when it
    /// is unreadable.
    ///
    /// # Errors
    /// Returns an error when an explicit settings file cannot be read or
    /// parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        let Some(path) = default_settings_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        match Self::read(&path) {
            Ok(settings) => Ok(settings),
            Err(error) => {
                warn!("{error}; using defaults");
                Ok(Self::default())
            }
        }
    }

    fn read(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|error| SettingsError::Read {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|error| SettingsError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    #[must_use]
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: Duration::from_secs(self.http_timeout_secs),
            retry_delays_secs: self.retry_delays_secs.clone(),
        }
    }

    /// Shared client for every fetcher.
    ///
    /// # Errors
    /// Returns an error when the TLS backend cannot be initialized.
    pub fn http_client(&self) -> Result<reqwest::Client, SettingsError> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .build()
            .map_err(|error| SettingsError::HttpClient(error.to_string()))
    }
}

#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}
