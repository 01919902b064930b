use super::{record_key, within_range};
use crate::core::aggregator::RecordSource;
use crate::core::records::{Domain, StoredRecord};
use crate::core::series::{RawPricePoint, SeriesProvider, SeriesRange};
use crate::core::symbol::Symbol;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-process record store, shared across clones.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, StoredRecord>>>,
    series: Arc<Mutex<HashMap<Symbol, Vec<RawPricePoint>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_record(&self, symbol: &Symbol, domain: Domain, record: StoredRecord) {
        let key = record_key(symbol, domain);
        debug!("Memory PUT for key: {}", key);
        self.records.lock().await.insert(key, record);
    }

    /// Replaces the stored series of `symbol`.
    pub async fn put_series(&self, symbol: &Symbol, points: Vec<RawPricePoint>) {
        self.series.lock().await.insert(symbol.clone(), points);
    }
}

#[async_trait]
impl RecordSource for MemoryStore {
    async fn fetch_record(&self, symbol: &Symbol, domain: Domain) -> Result<Option<StoredRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .get(&record_key(symbol, domain))
            .cloned())
    }
}

#[async_trait]
impl SeriesProvider for MemoryStore {
    async fn fetch_series(
        &self,
        symbol: &Symbol,
        range: SeriesRange,
    ) -> Result<Vec<RawPricePoint>> {
        let points = self
            .series
            .lock()
            .await
            .get(symbol)
            .cloned()
            .unwrap_or_default();
        Ok(within_range(points, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::tests::raw;
    use serde_json::json;

    fn nvda() -> Symbol {
        Symbol::parse("NVDA").unwrap()
    }

    #[tokio::test]
    async fn test_records_are_keyed_by_symbol_and_domain() {
        let store = MemoryStore::new();
        let record = StoredRecord {
            updated_at: None,
            data: json!({"last": 181.2}),
        };
        store.put_record(&nvda(), Domain::Quote, record.clone()).await;

        assert_eq!(
            store.fetch_record(&nvda(), Domain::Quote).await.unwrap(),
            Some(record)
        );
        assert!(store.fetch_record(&nvda(), Domain::Risk).await.unwrap().is_none());
        let amd = Symbol::parse("AMD").unwrap();
        assert!(store.fetch_record(&amd, Domain::Quote).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_series_is_empty() {
        let store = MemoryStore::new();
        let points = store.fetch_series(&nvda(), SeriesRange::Max).await.unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let store = MemoryStore::new();
        let other = store.clone();
        other
            .put_series(&nvda(), vec![raw("2026-10-16", 100.0)])
            .await;
        let points = store.fetch_series(&nvda(), SeriesRange::OneYear).await.unwrap();
        assert_eq!(points.len(), 1);
    }
}
