//! Price time series: raw observations, normalization and the provider seam.

use crate::core::error::ValidationError;
use crate::core::symbol::Symbol;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SeriesRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    YearToDate,
    #[default]
    OneYear,
    FiveYears,
    Max,
}

impl Display for SeriesRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SeriesRange::OneMonth => "1M",
                SeriesRange::ThreeMonths => "3M",
                SeriesRange::SixMonths => "6M",
                SeriesRange::YearToDate => "YTD",
                SeriesRange::OneYear => "1Y",
                SeriesRange::FiveYears => "5Y",
                SeriesRange::Max => "MAX",
            }
        )
    }
}

impl FromStr for SeriesRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1M" => Ok(SeriesRange::OneMonth),
            "3M" => Ok(SeriesRange::ThreeMonths),
            "6M" => Ok(SeriesRange::SixMonths),
            "YTD" => Ok(SeriesRange::YearToDate),
            "1Y" => Ok(SeriesRange::OneYear),
            "5Y" => Ok(SeriesRange::FiveYears),
            "MAX" => Ok(SeriesRange::Max),
            _ => Err(ValidationError::InvalidRange {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SeriesRange {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeriesRange> for String {
    fn from(value: SeriesRange) -> Self {
        value.to_string()
    }
}

impl SeriesRange {
    /// First date covered by the range when the latest observation is `latest`.
    /// `None` means unbounded.
    pub fn start_date(&self, latest: NaiveDate) -> Option<NaiveDate> {
        let days = match self {
            SeriesRange::OneMonth => 30,
            SeriesRange::ThreeMonths => 91,
            SeriesRange::SixMonths => 182,
            SeriesRange::OneYear => 365,
            SeriesRange::FiveYears => 365 * 5,
            SeriesRange::YearToDate => return NaiveDate::from_ymd_opt(latest.year(), 1, 1),
            SeriesRange::Max => return None,
        };
        Some(latest - Duration::days(days))
    }
}

/// A number as delivered by a source: numeric, a numeric string, or any
/// other JSON value, which never coerces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
    Other(Value),
}

impl RawNumber {
    /// The finite value, if there is one.
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            RawNumber::Number(n) => *n,
            RawNumber::Text(s) => s.trim().parse::<f64>().ok()?,
            RawNumber::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

/// One observation before validation. `time` is an ISO date or date-time;
/// anything else is kept as its JSON text and fails validation later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPricePoint {
    #[serde(default, deserialize_with = "lenient_time")]
    pub time: String,
    #[serde(default)]
    pub open: Option<RawNumber>,
    #[serde(default)]
    pub high: Option<RawNumber>,
    #[serde(default)]
    pub low: Option<RawNumber>,
    #[serde(default)]
    pub close: Option<RawNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<RawNumber>,
}

/// A validated OHLCV observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl PricePoint {
    /// Coerces and validates a raw observation; `None` marks it malformed.
    pub fn from_raw(raw: &RawPricePoint) -> Option<Self> {
        let time = parse_date(&raw.time)?;
        let open = raw.open.as_ref()?.coerce()?;
        let high = raw.high.as_ref()?.coerce()?;
        let low = raw.low.as_ref()?.coerce()?;
        let close = raw.close.as_ref()?.coerce()?;

        if [open, high, low, close].iter().any(|v| *v <= 0.0) {
            return None;
        }
        if high < open.max(close).max(low) || low > open.min(close) {
            return None;
        }

        let volume = raw
            .volume
            .as_ref()
            .and_then(RawNumber::coerce)
            .filter(|v| *v >= 0.0);

        Some(Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn lenient_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn parse_date(time: &str) -> Option<NaiveDate> {
    let date_part = time.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Time-ascending, one point per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub symbol: Symbol,
    pub points: Vec<PricePoint>,
}

/// A normalized series and the number of observations rejected on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesReport {
    pub series: TimeSeries,
    pub dropped: usize,
}

impl TimeSeries {
    /// Normalizes observations in whatever order the source delivered them.
    ///
    /// Malformed observations are dropped. The rest are sorted by date and,
    /// where a date repeats, the observation supplied last wins.
    pub fn from_raw(symbol: Symbol, raw: &[RawPricePoint]) -> SeriesReport {
        let mut valid: Vec<PricePoint> = Vec::with_capacity(raw.len());
        let mut dropped = 0;
        for point in raw {
            match PricePoint::from_raw(point) {
                Some(p) => valid.push(p),
                None => {
                    dropped += 1;
                    debug!(?point, "Dropping malformed price point");
                }
            }
        }

        // stable: equal dates keep their delivery order
        valid.sort_by_key(|p| p.time);

        let mut points: Vec<PricePoint> = Vec::with_capacity(valid.len());
        for point in valid {
            match points.last_mut() {
                Some(last) if last.time == point.time => *last = point,
                _ => points.push(point),
            }
        }

        SeriesReport {
            series: TimeSeries { symbol, points },
            dropped,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Volumes of the trailing `n` points, skipping points without one.
    pub fn trailing_volumes(&self, n: usize) -> Vec<f64> {
        let start = self.points.len().saturating_sub(n);
        self.points[start..].iter().filter_map(|p| p.volume).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Observations for `symbol` over `range`, in no particular order.
    async fn fetch_series(&self, symbol: &Symbol, range: SeriesRange)
    -> Result<Vec<RawPricePoint>>;
}

/// Fetches and normalizes the series for `symbol`.
#[instrument(name = "GetSeries", skip(provider), fields(symbol = %symbol, range = %range))]
pub async fn get_series(
    provider: &dyn SeriesProvider,
    symbol: &Symbol,
    range: SeriesRange,
) -> Result<SeriesReport> {
    let raw = provider.fetch_series(symbol, range).await?;
    let report = TimeSeries::from_raw(symbol.clone(), &raw);
    debug!(
        points = report.series.points.len(),
        dropped = report.dropped,
        "Normalized series"
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn raw(time: &str, close: f64) -> RawPricePoint {
        RawPricePoint {
            time: time.to_string(),
            open: Some(close.into()),
            high: Some((close + 1.0).into()),
            low: Some((close - 1.0).into()),
            close: Some(close.into()),
            volume: Some(1000.0.into()),
        }
    }

    fn nvda() -> Symbol {
        Symbol::parse("NVDA").unwrap()
    }

    #[test]
    fn test_range_parsing_and_display() {
        for range in [
            SeriesRange::OneMonth,
            SeriesRange::ThreeMonths,
            SeriesRange::SixMonths,
            SeriesRange::YearToDate,
            SeriesRange::OneYear,
            SeriesRange::FiveYears,
            SeriesRange::Max,
        ] {
            assert_eq!(range.to_string().parse::<SeriesRange>().unwrap(), range);
        }
        assert_eq!("ytd".parse::<SeriesRange>().unwrap(), SeriesRange::YearToDate);
        assert!("2W".parse::<SeriesRange>().is_err());
        assert_eq!(SeriesRange::default(), SeriesRange::OneYear);
    }

    #[test]
    fn test_range_start_dates() {
        let latest = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(
            SeriesRange::YearToDate.start_date(latest),
            NaiveDate::from_ymd_opt(2026, 1, 1)
        );
        assert_eq!(
            SeriesRange::OneMonth.start_date(latest),
            NaiveDate::from_ymd_opt(2026, 9, 16)
        );
        assert_eq!(SeriesRange::Max.start_date(latest), None);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let point: RawPricePoint = serde_json::from_str(
            r#"{"time":"2026-10-16T00:00:00.000Z","open":"100.5","high":"103","low":99,"close":"101.25"}"#,
        )
        .unwrap();
        let parsed = PricePoint::from_raw(&point).unwrap();
        assert_eq!(parsed.time, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(parsed.open, 100.5);
        assert_eq!(parsed.low, 99.0);
        assert_eq!(parsed.close, 101.25);
        assert_eq!(parsed.volume, None);
    }

    #[test]
    fn test_unparseable_point_is_dropped_and_order_kept() {
        let mut bad = raw("2026-10-14", 105.0);
        bad.close = Some(RawNumber::Text("n/a".to_string()));
        let input = vec![
            raw("2026-10-13", 100.0),
            bad,
            raw("2026-10-15", 110.0),
            raw("2026-10-16", 111.0),
        ];

        let report = TimeSeries::from_raw(nvda(), &input);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.series.closes(), vec![100.0, 110.0, 111.0]);
    }

    #[test]
    fn test_wrong_typed_values_drop_only_their_point() {
        let input: Vec<RawPricePoint> = serde_json::from_str(
            r#"[
                {"time":"2026-10-13","open":100,"high":101,"low":99,"close":100},
                {"time":"2026-10-14","open":100,"high":101,"low":99,"close":true},
                {"time":"2026-10-15","open":{"v":1},"high":111,"low":109,"close":110},
                {"time":1792108800,"open":100,"high":101,"low":99,"close":100},
                {"time":"2026-10-16","open":110,"high":112,"low":109,"close":111}
            ]"#,
        )
        .unwrap();
        assert_eq!(input[1].close, Some(RawNumber::Other(Value::Bool(true))));
        assert_eq!(input[3].time, "1792108800");

        let report = TimeSeries::from_raw(nvda(), &input);
        assert_eq!(report.dropped, 3);
        assert_eq!(report.series.closes(), vec![100.0, 111.0]);
    }

    #[test]
    fn test_missing_and_inconsistent_fields_are_malformed() {
        let mut no_open = raw("2026-10-13", 100.0);
        no_open.open = None;
        let mut inverted = raw("2026-10-14", 100.0);
        inverted.high = Some(90.0.into());
        let mut zero = raw("2026-10-15", 100.0);
        zero.low = Some(0.0.into());
        let bad_time = raw("yesterday", 100.0);
        let mut infinite = raw("2026-10-16", 100.0);
        infinite.open = Some(RawNumber::Text("inf".to_string()));

        for point in [no_open, inverted, zero, bad_time, infinite] {
            assert!(PricePoint::from_raw(&point).is_none(), "{point:?}");
        }
    }

    #[test]
    fn test_sorts_and_deduplicates_by_date() {
        let input = vec![
            raw("2026-10-16", 111.0),
            raw("2026-10-14", 100.0),
            raw("2026-10-15T09:30:00Z", 104.0),
            raw("2026-10-15T16:00:00Z", 106.0),
        ];
        let report = TimeSeries::from_raw(nvda(), &input);
        assert_eq!(report.dropped, 0);
        let dates: Vec<String> = report
            .series
            .points
            .iter()
            .map(|p| p.time.to_string())
            .collect();
        assert_eq!(dates, vec!["2026-10-14", "2026-10-15", "2026-10-16"]);
        assert_eq!(report.series.closes(), vec![100.0, 106.0, 111.0]);
    }

    #[test]
    fn test_bad_volume_does_not_drop_point() {
        let mut point = raw("2026-10-16", 100.0);
        point.volume = Some(RawNumber::Text("lots".to_string()));
        let parsed = PricePoint::from_raw(&point).unwrap();
        assert_eq!(parsed.volume, None);
    }
}
