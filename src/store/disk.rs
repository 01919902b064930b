use super::{Bundle, record_key, within_range};
use crate::core::aggregator::RecordSource;
use crate::core::records::{Domain, StoredRecord};
use crate::core::series::{RawPricePoint, SeriesProvider, SeriesRange};
use crate::core::symbol::Symbol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Persistent record store backed by a fjall keyspace.
///
/// Records live in the `records` partition under `SYMBOL/domain`; series
/// live in the `series` partition under the bare symbol.
#[derive(Clone)]
pub struct RecordStore {
    keyspace: Keyspace,
    records: PartitionHandle,
    series: PartitionHandle,
}

/// What an import wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub symbol: Symbol,
    pub records: usize,
    pub series_points: Option<usize>,
}

impl RecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open record store at {}", path.display()))?;
        let records = keyspace.open_partition("records", PartitionCreateOptions::default())?;
        let series = keyspace.open_partition("series", PartitionCreateOptions::default())?;
        debug!("Opened record store at {}", path.display());

        Ok(Self {
            keyspace,
            records,
            series,
        })
    }

    pub fn put_record(&self, symbol: &Symbol, domain: Domain, record: &StoredRecord) -> Result<()> {
        let key = record_key(symbol, domain);
        self.records.insert(key.as_str(), serde_json::to_vec(record)?)?;
        debug!("Store PUT for key: {}", key);
        Ok(())
    }

    /// Replaces the stored series of `symbol`.
    pub fn put_series(&self, symbol: &Symbol, points: &[RawPricePoint]) -> Result<()> {
        self.series
            .insert(symbol.as_str(), serde_json::to_vec(points)?)?;
        debug!("Store PUT for series: {} ({} points)", symbol, points.len());
        Ok(())
    }

    /// Domains that currently hold a record for `symbol`.
    pub fn domains(&self, symbol: &Symbol) -> Result<Vec<Domain>> {
        let prefix = format!("{symbol}/");
        let mut domains = Vec::new();
        for entry in self.records.prefix(&prefix) {
            let (key, _) = entry?;
            let key = String::from_utf8_lossy(&key);
            if let Some(domain) = key.strip_prefix(&prefix).and_then(|d| d.parse().ok()) {
                domains.push(domain);
            }
        }
        Ok(domains)
    }

    /// Writes every record of the bundle, then its series if present.
    #[instrument(name = "ImportBundle", skip(self, bundle), fields(symbol = %bundle.symbol))]
    pub fn import(&self, bundle: &Bundle) -> Result<ImportSummary> {
        for (domain, record) in &bundle.records {
            self.put_record(&bundle.symbol, *domain, record)?;
        }
        if let Some(points) = &bundle.series {
            self.put_series(&bundle.symbol, points)?;
        }
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist record store")?;

        let summary = ImportSummary {
            symbol: bundle.symbol.clone(),
            records: bundle.records.len(),
            series_points: bundle.series.as_ref().map(Vec::len),
        };
        info!(?summary, "Imported bundle");
        Ok(summary)
    }
}

#[async_trait]
impl RecordSource for RecordStore {
    async fn fetch_record(&self, symbol: &Symbol, domain: Domain) -> Result<Option<StoredRecord>> {
        let key = record_key(symbol, domain);
        match self.records.get(&key)? {
            Some(value) => {
                debug!("Store HIT for key: {}", key);
                let record = serde_json::from_slice(&value)
                    .with_context(|| format!("Corrupt record at {key}"))?;
                Ok(Some(record))
            }
            None => {
                debug!("Store MISS for key: {}", key);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SeriesProvider for RecordStore {
    async fn fetch_series(
        &self,
        symbol: &Symbol,
        range: SeriesRange,
    ) -> Result<Vec<RawPricePoint>> {
        let points: Vec<RawPricePoint> = match self.series.get(symbol.as_str())? {
            Some(value) => serde_json::from_slice(&value)
                .with_context(|| format!("Corrupt series for {symbol}"))?,
            None => Vec::new(),
        };
        Ok(within_range(points, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::tests::raw;
    use serde_json::json;
    use tempfile::tempdir;

    fn nvda() -> Symbol {
        Symbol::parse("NVDA").unwrap()
    }

    fn quote_record() -> StoredRecord {
        StoredRecord {
            updated_at: Some("2026-10-16T20:00:00Z".parse().unwrap()),
            data: json!({"last": 181.2, "lastTimestamp": "2026-10-16T20:00:00Z"}),
        }
    }

    #[tokio::test]
    async fn test_put_and_fetch_record() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        assert!(store.fetch_record(&nvda(), Domain::Quote).await.unwrap().is_none());

        store.put_record(&nvda(), Domain::Quote, &quote_record()).unwrap();
        assert_eq!(
            store.fetch_record(&nvda(), Domain::Quote).await.unwrap(),
            Some(quote_record())
        );
        assert_eq!(store.domains(&nvda()).unwrap(), vec![Domain::Quote]);
    }

    #[tokio::test]
    async fn test_symbols_do_not_share_prefixes() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let nv = Symbol::parse("NV").unwrap();

        store.put_record(&nvda(), Domain::Quote, &quote_record()).unwrap();
        assert!(store.domains(&nv).unwrap().is_empty());
        assert!(store.fetch_record(&nv, Domain::Quote).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_survives_reopen() {
        let dir = tempdir().unwrap();
        let bundle = Bundle {
            symbol: nvda(),
            records: [(Domain::Quote, quote_record())].into_iter().collect(),
            series: Some(vec![raw("2026-10-15", 100.0), raw("2026-10-16", 110.0)]),
        };

        {
            let store = RecordStore::open(dir.path()).unwrap();
            let summary = store.import(&bundle).unwrap();
            assert_eq!(summary.records, 1);
            assert_eq!(summary.series_points, Some(2));
        }

        let store = RecordStore::open(dir.path()).unwrap();
        assert_eq!(
            store.fetch_record(&nvda(), Domain::Quote).await.unwrap(),
            Some(quote_record())
        );
        let points = store.fetch_series(&nvda(), SeriesRange::Max).await.unwrap();
        assert_eq!(points.len(), 2);
    }

    #[tokio::test]
    async fn test_series_is_filtered_by_range() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store
            .put_series(
                &nvda(),
                &[
                    raw("2024-01-02", 50.0),
                    raw("2026-10-01", 100.0),
                    raw("2026-10-16", 110.0),
                ],
            )
            .unwrap();

        let month = store.fetch_series(&nvda(), SeriesRange::OneMonth).await.unwrap();
        assert_eq!(month.len(), 2);
        let all = store.fetch_series(&nvda(), SeriesRange::Max).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_stored_series_with_wrong_typed_point_still_loads() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let stored = json!([
            {"time": "2026-10-14", "open": 100, "high": 101, "low": 99, "close": 100},
            {"time": "2026-10-15", "open": 100, "high": 101, "low": 99, "close": true},
            {"time": "2026-10-16", "open": 104, "high": 106, "low": 103, "close": 105}
        ]);
        store
            .series
            .insert(nvda().as_str(), serde_json::to_vec(&stored).unwrap())
            .unwrap();

        let report = crate::core::series::get_series(&store, &nvda(), SeriesRange::Max)
            .await
            .unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(report.series.closes(), vec![100.0, 105.0]);
    }
}
