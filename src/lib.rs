pub mod cli;
pub mod core;
pub mod dashboard;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::core::aggregator::SnapshotAggregator;
use crate::core::cache::Cache;
use crate::core::config::{AppConfig, SeriesSource};
use crate::core::series::SeriesProvider;
use crate::providers::yahoo_finance::{SeriesCache, YahooSeriesProvider};
use crate::store::RecordStore;
use anyhow::Result;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Snapshot {
        symbol: String,
        json: bool,
    },
    Series {
        symbol: String,
        range: Option<String>,
        json: bool,
    },
    View,
    Import {
        paths: Vec<String>,
    },
}

/// Collaborators shared by the commands, built from configuration.
pub struct App {
    pub config: AppConfig,
    store: Mutex<Option<RecordStore>>,
    series_cache: Arc<SeriesCache>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let ttl = Some(Duration::from_secs(config.series.cache_ttl_secs));
        Self {
            config,
            store: Mutex::new(None),
            series_cache: Arc::new(Cache::with_ttl(ttl)),
        }
    }

    /// The record store, opened on first use.
    pub fn store(&self) -> Result<RecordStore> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(opened) = store.as_ref() {
            return Ok(opened.clone());
        }
        let opened = RecordStore::open(&self.config.data_path()?)?;
        *store = Some(opened.clone());
        Ok(opened)
    }

    pub fn aggregator(&self) -> Result<SnapshotAggregator> {
        Ok(SnapshotAggregator::new(Arc::new(self.store()?)))
    }

    pub fn series_provider(&self) -> Result<Arc<dyn SeriesProvider>> {
        let series = &self.config.series;
        match series.source {
            SeriesSource::Yahoo => Ok(Arc::new(
                YahooSeriesProvider::new(
                    self.config.yahoo_base_url(),
                    Arc::clone(&self.series_cache),
                )
                .with_retry_policy(series.retries, series.retry_delay_ms),
            )),
            SeriesSource::Store => Ok(Arc::new(self.store()?)),
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("tkr starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    let app = App::new(config);

    match command {
        AppCommand::Snapshot { symbol, json } => cli::snapshot::run(&app, &symbol, json).await,
        AppCommand::Series {
            symbol,
            range,
            json,
        } => cli::series::run(&app, &symbol, range.as_deref(), json).await,
        AppCommand::View => cli::view::run(&app).await,
        AppCommand::Import { paths } => cli::import::run(&app, &paths),
    }
}
