use crate::core::series::SeriesRange;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

/// Where price series come from.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeriesSource {
    #[default]
    Yahoo,
    /// Series previously imported into the local record store
    Store,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SeriesConfig {
    pub source: SeriesSource,
    pub default_range: SeriesRange,
    pub retries: usize,
    pub retry_delay_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            source: SeriesSource::default(),
            default_range: SeriesRange::default(),
            retries: 2,
            retry_delay_ms: 500,
            cache_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub series: SeriesConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the default config file, or defaults when none has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "tkr", "tkr")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Directory holding the record store.
    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "tkr", "tkr")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("store"))
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
