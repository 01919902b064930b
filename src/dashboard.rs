//! Presentation surface: shows one symbol at a time and re-fetches when the
//! selection changes.

use crate::core::aggregator::SnapshotAggregator;
use crate::core::chart::{ChartData, ChartSurface, render_chart};
use crate::core::error::SnapshotError;
use crate::core::metrics::DerivedMetrics;
use crate::core::series::{SeriesProvider, SeriesRange, TimeSeries, get_series};
use crate::core::snapshot::SnapshotReport;
use crate::core::symbol::Symbol;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Found {
        report: Box<SnapshotReport>,
        metrics: DerivedMetrics,
    },
    /// No identity record exists for the symbol.
    NotFound,
    Failed(String),
}

/// Everything displayed for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolView {
    pub symbol: Symbol,
    pub outcome: SnapshotOutcome,
    pub chart: ChartData,
    pub dropped_points: usize,
    pub series_error: Option<String>,
}

/// Fetches the snapshot and the series for `symbol` concurrently.
#[instrument(name = "LoadView", skip(aggregator, series), fields(symbol = %symbol, range = %range))]
pub async fn load_view(
    aggregator: &SnapshotAggregator,
    series: &dyn SeriesProvider,
    symbol: &Symbol,
    range: SeriesRange,
) -> SymbolView {
    let (snapshot, series) = tokio::join!(
        aggregator.build_snapshot(symbol),
        get_series(series, symbol, range)
    );

    let (series, dropped_points, series_error) = match series {
        Ok(report) => (report.series, report.dropped, None),
        Err(e) => {
            warn!(%symbol, "Series unavailable: {e:#}");
            let empty = TimeSeries {
                symbol: symbol.clone(),
                points: Vec::new(),
            };
            (empty, 0, Some(format!("{e:#}")))
        }
    };

    let outcome = match snapshot {
        Ok(report) => SnapshotOutcome::Found {
            metrics: DerivedMetrics::compute(Some(&report.snapshot), &series),
            report: Box::new(report),
        },
        Err(SnapshotError::NotFound(_)) => SnapshotOutcome::NotFound,
        Err(e) => SnapshotOutcome::Failed(e.to_string()),
    };

    SymbolView {
        symbol: symbol.clone(),
        outcome,
        chart: ChartData::from_series(&series),
        dropped_points,
        series_error,
    }
}

/// A display that can draw a chart and the rest of a symbol's view.
pub trait Screen: ChartSurface + 'static {
    fn show(&mut self, view: &SymbolView);
}

struct Shared<S> {
    active: Option<Symbol>,
    screen: S,
}

/// Applies `view` only when its symbol is still the active one.
fn apply_if_current<S: Screen>(shared: &Mutex<Shared<S>>, view: SymbolView) -> bool {
    let mut state = lock(shared);
    if state.active.as_ref() != Some(&view.symbol) {
        debug!(
            stale = %view.symbol,
            active = ?state.active.as_ref().map(Symbol::as_str),
            "Discarding stale result"
        );
        return false;
    }
    render_chart(&mut state.screen, &view.chart.points);
    state.screen.show(&view);
    true
}

fn lock<S>(shared: &Mutex<Shared<S>>) -> MutexGuard<'_, Shared<S>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Dashboard<S: Screen> {
    aggregator: Arc<SnapshotAggregator>,
    series: Arc<dyn SeriesProvider>,
    range: SeriesRange,
    shared: Arc<Mutex<Shared<S>>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<S: Screen> Dashboard<S> {
    pub fn new(
        aggregator: Arc<SnapshotAggregator>,
        series: Arc<dyn SeriesProvider>,
        range: SeriesRange,
        screen: S,
    ) -> Self {
        Self {
            aggregator,
            series,
            range,
            shared: Arc::new(Mutex::new(Shared {
                active: None,
                screen,
            })),
            in_flight: None,
        }
    }

    /// Makes `symbol` the active one and starts loading it. Whatever was
    /// loading for the previous symbol is abandoned.
    pub fn select(&mut self, symbol: Symbol) {
        lock(&self.shared).active = Some(symbol.clone());
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let aggregator = Arc::clone(&self.aggregator);
        let series = Arc::clone(&self.series);
        let shared = Arc::clone(&self.shared);
        let range = self.range;
        self.in_flight = Some(tokio::spawn(async move {
            let view = load_view(&aggregator, series.as_ref(), &symbol, range).await;
            apply_if_current(&shared, view);
        }));
    }

    pub fn active(&self) -> Option<Symbol> {
        lock(&self.shared).active.clone()
    }

    /// Waits for the current load, if any, to finish.
    pub async fn wait_idle(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!("Dashboard load failed: {e}"),
            }
        }
    }

    pub fn with_screen<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&lock(&self.shared).screen)
    }
}

impl<S: Screen> Drop for Dashboard<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
