//! Read-model aggregation, derived metrics and series normalization

pub mod aggregator;
pub mod cache;
pub mod chart;
pub mod config;
pub mod error;
pub mod log;
pub mod metrics;
pub mod records;
pub mod series;
pub mod snapshot;
pub mod symbol;

// Re-export main types for cleaner imports
pub use aggregator::{RecordSource, SnapshotAggregator};
pub use chart::{ChartData, ChartPoint, ChartSurface, PriceSummary};
pub use error::{MetricError, SnapshotError, ValidationError};
pub use metrics::DerivedMetrics;
pub use records::{Domain, StoredRecord};
pub use series::{RawPricePoint, SeriesProvider, SeriesRange, TimeSeries};
pub use snapshot::{Snapshot, SnapshotReport};
pub use symbol::Symbol;
