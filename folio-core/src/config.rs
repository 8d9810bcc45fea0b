use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FolioConfig {
    pub qiita: QiitaConfig,
    pub cache: CacheConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QiitaConfig {
    pub api_base: String,
    pub user: String,
    pub per_page: u32,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_minutes: u64,
    pub rate_limit_check_seconds: u64,
}

/// Page sizes per presentation context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListingConfig {
    pub home_page_size: usize,
    pub index_page_size: usize,
    pub compact_page_size: usize,
}

impl Default for QiitaConfig {
    fn default() -> Self {
        Self {
            api_base: "https://qiita.com/api/v2".to_string(),
            user: "Pitta".to_string(),
            per_page: 20,
            request_timeout_seconds: 10,
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 10,
            rate_limit_check_seconds: 60,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            home_page_size: 5,
            index_page_size: 12,
            compact_page_size: 6,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }

    pub fn rate_limit_check_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_check_seconds)
    }
}

impl QiitaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// `<api_base>/users/<user>/items?page=1&per_page=<per_page>`
    pub fn items_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(self.api_base.trim_end_matches('/'))?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid("qiita.api_base cannot be a base URL"))?
            .extend(["users", self.user.as_str(), "items"]);
        url.query_pairs_mut()
            .append_pair("page", "1")
            .append_pair("per_page", &self.per_page.to_string());
        Ok(url)
    }
}

impl FolioConfig {
    /// `~/.config/folio` on Linux.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("folio"))
    }

    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Loads the user configuration, falling back to (and saving) defaults.
    pub fn load() -> Self {
        let loaded = Self::config_file_path().and_then(|path| Self::load_from(&path));
        match loaded {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "could not load configuration, using defaults");
                let config = Self::default();
                let saved = Self::config_file_path().and_then(|path| config.save_to(&path));
                if let Err(err) = saved {
                    warn!(error = %err, "could not save default configuration");
                }
                config
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: FolioConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.qiita.user.trim().is_empty() {
            return Err(ConfigError::Invalid("qiita.user must be non-empty"));
        }
        if self.qiita.per_page == 0 {
            return Err(ConfigError::Invalid("qiita.per_page must be > 0"));
        }
        if self.cache.ttl_minutes == 0 {
            return Err(ConfigError::Invalid("cache.ttl_minutes must be > 0"));
        }
        if self.cache.rate_limit_check_seconds == 0 {
            return Err(ConfigError::Invalid(
                "cache.rate_limit_check_seconds must be > 0",
            ));
        }
        let listing = &self.listing;
        if listing.home_page_size == 0
            || listing.index_page_size == 0
            || listing.compact_page_size == 0
        {
            return Err(ConfigError::Invalid("listing page sizes must be > 0"));
        }
        Ok(())
    }
}
