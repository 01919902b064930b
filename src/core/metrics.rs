//! Values derived from raw fields on every request.
//!
//! Nothing here is stored. Each function is pure and reports why a value
//! cannot be produced through [`MetricError`]; [`DerivedMetrics::compute`]
//! turns those errors into absent fields.

use crate::core::error::MetricError;
use crate::core::series::TimeSeries;
use crate::core::snapshot::Snapshot;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr as finprim_cagr;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Percentage change from `previous` to `current`.
pub fn change_pct(current: f64, previous: f64) -> Result<f64, MetricError> {
    if !current.is_finite() || !previous.is_finite() {
        return Err(MetricError::NonFinite);
    }
    if previous == 0.0 {
        return Err(MetricError::DivisionUndefined);
    }
    Ok((current - previous) / previous * 100.0)
}

/// Compound annual growth rate, as a percentage.
///
/// Undefined for a non-positive starting value or period, and for a negative
/// ending value.
pub fn cagr(begin_value: f64, end_value: f64, years: f64) -> Result<f64, MetricError> {
    if !begin_value.is_finite() || !end_value.is_finite() || !years.is_finite() {
        return Err(MetricError::NonFinite);
    }
    if begin_value <= 0.0 || years <= 0.0 || end_value < 0.0 {
        return Err(MetricError::UndefinedGrowth);
    }
    if end_value == 0.0 {
        return Ok(-100.0);
    }
    // Decimal exponentiation overflows outside this band.
    let growth = (end_value / begin_value).powf(1.0 / years);
    if !(1e-6..=1e6).contains(&growth) {
        return Err(MetricError::UndefinedGrowth);
    }

    let begin_bal = Decimal::from_f64(begin_value).ok_or(MetricError::NonFinite)?;
    let end_bal = Decimal::from_f64(end_value).ok_or(MetricError::NonFinite)?;
    let n_years = Decimal::from_f64(years).ok_or(MetricError::NonFinite)?;
    if n_years.is_zero() {
        return Err(MetricError::UndefinedGrowth);
    }

    let rate = finprim_cagr(begin_bal, end_bal, n_years);
    let percentage = (rate * Decimal::from(100))
        .to_f64()
        .ok_or(MetricError::NonFinite)?;
    debug!("cagr: {begin_bal}, {end_bal}, {n_years} = {rate}, {percentage}");
    Ok(percentage)
}

/// Mean of the trailing `window` values.
pub fn moving_average(values: &[f64], window: usize) -> Result<f64, MetricError> {
    let tail = trailing(values, window)?;
    Ok(tail.iter().sum::<f64>() / window as f64)
}

/// Highest and lowest of the trailing `window` values.
pub fn window_high_low(values: &[f64], window: usize) -> Result<(f64, f64), MetricError> {
    let tail = trailing(values, window)?;
    let high = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let low = tail.iter().copied().fold(f64::INFINITY, f64::min);
    Ok((high, low))
}

fn trailing(values: &[f64], window: usize) -> Result<&[f64], MetricError> {
    if window == 0 || values.len() < window {
        return Err(MetricError::InsufficientWindow {
            required: window.max(1),
            available: values.len(),
        });
    }
    let tail = &values[values.len() - window..];
    if tail.iter().any(|v| !v.is_finite()) {
        return Err(MetricError::NonFinite);
    }
    Ok(tail)
}

/// Metrics computed from a snapshot and its price series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    /// Last price against the session open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_change_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_from_prev_close_pct: Option<f64>,
    /// Mean analyst price target against the last price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implied_upside_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_volume_10d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_volume_30d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_20: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_low: Option<f64>,
    /// Annualized growth between the first and last close of the series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_cagr_pct: Option<f64>,
}

impl DerivedMetrics {
    pub fn compute(snapshot: Option<&Snapshot>, series: &TimeSeries) -> Self {
        let quote = snapshot.and_then(|s| s.quote.as_ref());
        let ratings = snapshot.and_then(|s| s.ratings.as_ref());
        let closes = series.closes();
        let volumes = series.trailing_volumes(30);

        let day_change_pct = quote
            .and_then(|q| q.open.map(|open| change_pct(q.last, open)))
            .and_then(|r| absent_on_error("dayChangePct", r));
        let change_from_prev_close_pct = quote
            .and_then(|q| q.prev_close.map(|prev| change_pct(q.last, prev)))
            .and_then(|r| absent_on_error("changeFromPrevClosePct", r));
        let implied_upside_pct = quote
            .zip(ratings.and_then(|r| r.price_target_mean))
            .and_then(|(q, target)| absent_on_error("impliedUpsidePct", change_pct(target, q.last)));

        let (range_high, range_low) =
            match absent_on_error("range", window_high_low(&closes, closes.len())) {
                Some((high, low)) => (Some(high), Some(low)),
                None => (None, None),
            };

        let series_cagr_pct = match (series.points.first(), series.points.last()) {
            (Some(first), Some(last)) => {
                let years = (last.time - first.time).num_days() as f64 / 365.0;
                absent_on_error("seriesCagrPct", cagr(first.close, last.close, years))
            }
            _ => None,
        };

        Self {
            day_change_pct,
            change_from_prev_close_pct,
            implied_upside_pct,
            average_volume_10d: absent_on_error(
                "averageVolume10d",
                moving_average(&series.trailing_volumes(10), 10),
            ),
            average_volume_30d: absent_on_error("averageVolume30d", moving_average(&volumes, 30)),
            sma_20: absent_on_error("sma20", moving_average(&closes, 20)),
            sma_50: absent_on_error("sma50", moving_average(&closes, 50)),
            range_high,
            range_low,
            series_cagr_pct,
        }
    }
}

fn absent_on_error<T>(name: &str, result: Result<T, MetricError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(metric = name, error = %e, "Derived metric unavailable");
            None
        }
    }
}
