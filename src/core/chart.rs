//! Adapts a normalized series to what a chart renderer consumes.

use crate::core::metrics::change_pct;
use crate::core::series::{PricePoint, TimeSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One candle in renderer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl From<&PricePoint> for ChartPoint {
    fn from(p: &PricePoint) -> Self {
        Self {
            time: p.time,
            open: p.open,
            high: p.high,
            low: p.low,
            close: p.close,
            volume: p.volume,
        }
    }
}

/// Latest close and its change against the close before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
}

impl PriceSummary {
    /// With a single point the previous close is the current one, so the
    /// change is zero. With no points both values are absent.
    pub fn from_points(points: &[ChartPoint]) -> Self {
        let Some(last) = points.last() else {
            return Self::default();
        };
        let previous = points
            .len()
            .checked_sub(2)
            .map_or(last.close, |i| points[i].close);

        Self {
            current_price: Some(last.close),
            change_pct: change_pct(last.close, previous).ok(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub points: Vec<ChartPoint>,
    pub summary: PriceSummary,
}

impl ChartData {
    pub fn from_series(series: &TimeSeries) -> Self {
        let points: Vec<ChartPoint> = series.points.iter().map(ChartPoint::from).collect();
        let summary = PriceSummary::from_points(&points);
        Self { points, summary }
    }
}

/// A drawing target that accepts a time-ordered candle sequence.
pub trait ChartSurface: Send {
    fn clear(&mut self);
    fn set_data(&mut self, points: &[ChartPoint]);
}

/// Draws `points` on a surface emptied of anything drawn before.
pub fn render_chart<S: ChartSurface + ?Sized>(surface: &mut S, points: &[ChartPoint]) {
    surface.clear();
    surface.set_data(points);
}
