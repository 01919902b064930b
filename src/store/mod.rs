//! Storage collaborators holding per-domain records and price series.

pub mod disk;
pub mod memory;

pub use disk::RecordStore;
pub use memory::MemoryStore;

use crate::core::records::{Domain, StoredRecord};
use crate::core::series::{PricePoint, RawPricePoint, SeriesRange};
use crate::core::symbol::Symbol;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Everything known about one symbol, as exchanged with upstream ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub symbol: Symbol,
    #[serde(default)]
    pub records: HashMap<Domain, StoredRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<RawPricePoint>>,
}

impl Bundle {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bundle: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse bundle: {}", path.display()))
    }
}

pub(crate) fn record_key(symbol: &Symbol, domain: Domain) -> String {
    format!("{}/{}", symbol, domain.key())
}

/// Keeps the observations inside `range`, measured back from the latest
/// valid observation. Points without a usable date are kept so that
/// normalization can account for them.
pub(crate) fn within_range(points: Vec<RawPricePoint>, range: SeriesRange) -> Vec<RawPricePoint> {
    let dates: Vec<_> = points
        .iter()
        .map(|p| PricePoint::from_raw(p).map(|v| v.time))
        .collect();
    let Some(start) = dates
        .iter()
        .flatten()
        .max()
        .and_then(|latest| range.start_date(*latest))
    else {
        return points;
    };

    points
        .into_iter()
        .zip(dates)
        .filter(|(_, date)| date.is_none_or(|d| d >= start))
        .map(|(p, _)| p)
        .collect()
}
