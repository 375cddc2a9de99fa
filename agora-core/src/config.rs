//! Client configuration.
//!
//! Loaded from `config.toml` in the platform configuration directory
//! (`~/.config/agora/config.toml` on Linux). Missing files yield defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const BASE_URL_ENV: &str = "AGORA_BASE_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`ClientConfig`].
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A URL setting is malformed.
    #[error("invalid URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Where the session record is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Kept in process memory only.
    Memory,
    /// JSON file in the data directory.
    #[default]
    File,
    /// OS keyring.
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin the API is served from.
    pub base_url: Url,

    /// Root path prefixed to every API call.
    pub api_prefix: String,

    /// Origin that server-relative image paths are resolved against.
    pub asset_origin: Url,

    /// Re-authentication entry point.
    pub login_path: String,

    /// Transport timeout; `None` keeps the transport default.
    pub request_timeout_secs: Option<u64>,

    pub storage: StorageBackend,

    /// Overrides the platform data directory for file storage.
    pub data_dir: Option<PathBuf>,

    /// Path of the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:4000").expect("static URL is valid"),
            api_prefix: "/api".to_string(),
            asset_origin: Url::parse("https://front-mission.bigs.or.kr")
                .expect("static URL is valid"),
            login_path: "/login".to_string(),
            request_timeout_secs: None,
            storage: StorageBackend::default(),
            data_dir: None,
            config_path: None,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with every other setting at its default.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url(base_url)?,
            ..Self::default()
        })
    }

    /// Use the given storage backend.
    pub fn with_storage(mut self, storage: StorageBackend) -> Self {
        self.storage = storage;
        self
    }

    /// Absolute URL for an API path such as `/boards/42`.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let root = self.base_url.as_str().trim_end_matches('/');
        let prefix = self.api_prefix.trim_end_matches('/');
        Url::parse(&format!("{}{}{}", root, prefix, path))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("agora.toml"))
}

/// Load configuration from the default location or create defaults.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(&default_config_path())
}

/// Load configuration from `path`, applying the environment override.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        ClientConfig::default()
    };

    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        config.base_url = parse_url(&base_url)?;
    }

    config.config_path = Some(path.to_path_buf());
    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "agora-board", "agora")
}
