//! Merges independently fetched domain records into one [`Snapshot`].

use crate::core::error::SnapshotError;
use crate::core::records::{
    ClassificationDetails, CorporateActions, DividendProfile, Domain, EarningsProfile, Esg,
    Fundamentals, Identity, Ownership, Performance, Quote, Ratings, RiskMetrics, StoredRecord,
    TradingStats,
};
use crate::core::snapshot::{Classification, SkipReason, SkippedDomain, Snapshot, SnapshotReport};
use crate::core::symbol::Symbol;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Read access to the per-domain records of a symbol.
///
/// `Ok(None)` means the source holds no record for the domain; `Err` means
/// the lookup itself failed.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_record(&self, symbol: &Symbol, domain: Domain) -> Result<Option<StoredRecord>>;
}

pub struct SnapshotAggregator {
    source: Arc<dyn RecordSource>,
    clock: fn() -> DateTime<Utc>,
}

impl SnapshotAggregator {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            clock: Utc::now,
        }
    }

    /// Replaces the clock used when no record carries a modification time.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Fetches every domain concurrently and merges the results.
    ///
    /// All fetches settle before anything is merged. A missing, failing or
    /// malformed non-identity domain leaves its section empty and is listed
    /// in [`SnapshotReport::skipped`]; only the identity record is required.
    #[instrument(name = "BuildSnapshot", skip(self), fields(symbol = %symbol))]
    pub async fn build_snapshot(&self, symbol: &Symbol) -> Result<SnapshotReport, SnapshotError> {
        let fetches = Domain::ALL.into_iter().map(|domain| async move {
            let result = self.source.fetch_record(symbol, domain).await;
            (domain, result)
        });
        let fetched: HashMap<Domain, Result<Option<StoredRecord>>> =
            join_all(fetches).await.into_iter().collect();
        debug!("All {} domain fetches settled", fetched.len());

        let mut merge = Merge {
            fetched,
            skipped: Vec::new(),
            latest: None,
        };

        let identity = merge.identity(symbol)?;
        let details = merge.section::<ClassificationDetails>(Domain::Classification);

        let snapshot = Snapshot {
            identifiers: identity.identifiers,
            metadata: identity.metadata,
            classification: Classification {
                asset_class: identity.asset_class,
                security_type: identity.security_type,
                details: details.unwrap_or_default(),
            },
            quote: merge.section::<Quote>(Domain::Quote),
            performance: merge.section::<Performance>(Domain::Performance),
            trading_stats: merge.section::<TradingStats>(Domain::TradingStats),
            fundamentals: merge.section::<Fundamentals>(Domain::Fundamentals),
            dividend_profile: merge.section::<DividendProfile>(Domain::DividendProfile),
            earnings: merge.section::<EarningsProfile>(Domain::Earnings),
            corporate_actions: merge.section::<CorporateActions>(Domain::CorporateActions),
            risk: merge.section::<RiskMetrics>(Domain::Risk),
            ownership: merge.section::<Ownership>(Domain::Ownership),
            ratings: merge.section::<Ratings>(Domain::Ratings),
            esg: merge.section::<Esg>(Domain::Esg),
            last_updated_at: merge.latest.unwrap_or_else(self.clock),
        };

        let report = SnapshotReport {
            snapshot,
            skipped: merge.skipped,
        };
        if let Some(warning) = report.partial_warning() {
            warn!(%symbol, "{warning}");
        }
        Ok(report)
    }
}

struct Merge {
    fetched: HashMap<Domain, Result<Option<StoredRecord>>>,
    skipped: Vec<SkippedDomain>,
    latest: Option<DateTime<Utc>>,
}

impl Merge {
    fn identity(&mut self, symbol: &Symbol) -> Result<Identity, SnapshotError> {
        let record = match self.fetched.remove(&Domain::Identity) {
            Some(Ok(Some(record))) => record,
            Some(Ok(None)) | None => return Err(SnapshotError::NotFound(symbol.clone())),
            Some(Err(e)) => {
                return Err(SnapshotError::Unavailable {
                    symbol: symbol.clone(),
                    reason: format!("{e:#}"),
                });
            }
        };

        let identity: Identity =
            serde_json::from_value(record.data).map_err(|e| SnapshotError::InvalidIdentity {
                symbol: symbol.clone(),
                reason: e.to_string(),
            })?;
        if !symbol.matches(&identity.identifiers.symbol) {
            return Err(SnapshotError::InvalidIdentity {
                symbol: symbol.clone(),
                reason: format!("record declares symbol {}", identity.identifiers.symbol),
            });
        }
        self.touch(record.updated_at);
        Ok(identity)
    }

    fn section<T: DeserializeOwned>(&mut self, domain: Domain) -> Option<T> {
        match self.fetched.remove(&domain) {
            Some(Ok(Some(record))) => match serde_json::from_value::<T>(record.data) {
                Ok(value) => {
                    self.touch(record.updated_at);
                    Some(value)
                }
                Err(e) => {
                    self.skip(domain, SkipReason::Malformed(e.to_string()));
                    None
                }
            },
            Some(Ok(None)) | None => {
                self.skip(domain, SkipReason::Missing);
                None
            }
            Some(Err(e)) => {
                self.skip(domain, SkipReason::Failed(format!("{e:#}")));
                None
            }
        }
    }

    fn touch(&mut self, updated_at: Option<DateTime<Utc>>) {
        if let Some(ts) = updated_at {
            self.latest = Some(self.latest.map_or(ts, |latest| latest.max(ts)));
        }
    }

    fn skip(&mut self, domain: Domain, reason: SkipReason) {
        if domain.is_primary() {
            warn!(%domain, %reason, "Skipping section");
        } else {
            debug!(%domain, %reason, "Skipping optional section");
        }
        self.skipped.push(SkippedDomain { domain, reason });
    }
}
