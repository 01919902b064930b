//! The merged, point-in-time view of every domain record for one symbol.

use crate::core::records::{
    AssetClass, ClassificationDetails, CorporateActions, DividendProfile, Domain, EarningsProfile,
    Esg, Fundamentals, Identifiers, Metadata, Ownership, Performance, Quote, Ratings, RiskMetrics,
    SecurityType, TradingStats,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identity-sourced classification plus the classification record's details
/// when that record was available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub asset_class: AssetClass,
    pub security_type: SecurityType,
    #[serde(flatten)]
    pub details: ClassificationDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub identifiers: Identifiers,
    pub metadata: Metadata,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<Quote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trading_stats: Option<TradingStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundamentals: Option<Fundamentals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_profile: Option<DividendProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings: Option<EarningsProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_actions: Option<CorporateActions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Ownership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Ratings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esg: Option<Esg>,
    pub last_updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Whether the section fed by `domain` made it into the snapshot.
    pub fn has_section(&self, domain: Domain) -> bool {
        match domain {
            Domain::Identity => true,
            Domain::Classification => self.classification.details != ClassificationDetails::default(),
            Domain::Quote => self.quote.is_some(),
            Domain::Performance => self.performance.is_some(),
            Domain::TradingStats => self.trading_stats.is_some(),
            Domain::Fundamentals => self.fundamentals.is_some(),
            Domain::DividendProfile => self.dividend_profile.is_some(),
            Domain::Earnings => self.earnings.is_some(),
            Domain::CorporateActions => self.corporate_actions.is_some(),
            Domain::Risk => self.risk.is_some(),
            Domain::Ownership => self.ownership.is_some(),
            Domain::Ratings => self.ratings.is_some(),
            Domain::Esg => self.esg.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// The source has no record for this domain.
    Missing,
    /// The fetch itself failed.
    Failed(String),
    /// A record exists but does not have the expected shape.
    Malformed(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Missing => write!(f, "missing"),
            SkipReason::Failed(e) => write!(f, "fetch failed: {e}"),
            SkipReason::Malformed(e) => write!(f, "malformed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDomain {
    pub domain: Domain,
    pub reason: SkipReason,
}

/// Non-fatal: one or more primary sections could not be filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDataWarning {
    pub domains: Vec<Domain>,
}

impl Display for PartialDataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.domains.iter().map(|d| d.key()).collect();
        write!(f, "partial data, unavailable: {}", names.join(", "))
    }
}

/// A snapshot together with the diagnostics of how it was assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotReport {
    pub snapshot: Snapshot,
    pub skipped: Vec<SkippedDomain>,
}

impl SnapshotReport {
    pub fn partial_warning(&self) -> Option<PartialDataWarning> {
        let domains: Vec<Domain> = self
            .skipped
            .iter()
            .map(|s| s.domain)
            .filter(Domain::is_primary)
            .collect();
        if domains.is_empty() {
            None
        } else {
            Some(PartialDataWarning { domains })
        }
    }
}
