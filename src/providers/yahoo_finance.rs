use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::cache::Cache;
use crate::core::series::{RawNumber, RawPricePoint, SeriesProvider, SeriesRange};
use crate::core::symbol::Symbol;
use crate::providers::util::with_retry;

pub type SeriesCache = Cache<(Symbol, SeriesRange), Vec<RawPricePoint>>;

/// Daily candles from the Yahoo Finance chart endpoint.
pub struct YahooSeriesProvider {
    base_url: String,
    cache: Arc<SeriesCache>,
    retries: usize,
    retry_delay_ms: u64,
}

impl YahooSeriesProvider {
    pub fn new(base_url: &str, cache: Arc<SeriesCache>) -> Self {
        YahooSeriesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            retries: 2,
            retry_delay_ms: 500,
        }
    }

    pub fn with_retry_policy(mut self, retries: usize, retry_delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }
}

fn yahoo_range(range: SeriesRange) -> &'static str {
    match range {
        SeriesRange::OneMonth => "1mo",
        SeriesRange::ThreeMonths => "3mo",
        SeriesRange::SixMonths => "6mo",
        SeriesRange::YearToDate => "ytd",
        SeriesRange::OneYear => "1y",
        SeriesRange::FiveYears => "5y",
        SeriesRange::Max => "max",
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "gmtoffset", default)]
    gmt_offset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteBars>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteBars {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// One raw point per timestamp, dated in the exchange's local time. Null
/// bars come through as missing values for normalization to drop.
fn to_raw_points(item: &ChartItem) -> Vec<RawPricePoint> {
    let Some(timestamps) = item.timestamp.as_ref() else {
        return Vec::new();
    };
    let empty = QuoteBars::default();
    let bars = item
        .indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .unwrap_or(&empty);
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten().map(RawNumber::from);

    timestamps
        .iter()
        .enumerate()
        .map(|(i, ts)| RawPricePoint {
            time: DateTime::from_timestamp(ts + item.meta.gmt_offset, 0)
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or_default(),
            open: at(&bars.open, i),
            high: at(&bars.high, i),
            low: at(&bars.low, i),
            close: at(&bars.close, i),
            volume: at(&bars.volume, i),
        })
        .collect()
}

#[async_trait]
impl SeriesProvider for YahooSeriesProvider {
    #[instrument(
        name = "YahooSeriesFetch",
        skip(self),
        fields(symbol = %symbol, range = %range)
    )]
    async fn fetch_series(
        &self,
        symbol: &Symbol,
        range: SeriesRange,
    ) -> Result<Vec<RawPricePoint>> {
        let key = (symbol.clone(), range);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range={}",
            self.base_url,
            symbol,
            yahoo_range(range)
        );
        debug!("Requesting series from {}", url);

        let client = reqwest::Client::builder().user_agent("tkr/0.1").build()?;
        let response = with_retry(
            || async { client.get(&url).send().await?.error_for_status() },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        let text = response.text().await?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        if let Some(err) = data.chart.error {
            return Err(anyhow!(
                "Yahoo error {} for symbol {}: {}",
                err.code,
                symbol,
                err.description
            ));
        }
        let item = data
            .chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| anyhow!("No series data found for symbol: {}", symbol))?;

        let points = to_raw_points(item);
        if points.is_empty() {
            return Err(anyhow!("No series data found for symbol: {}", symbol));
        }
        debug!("Received {} raw points", points.len());
        self.cache.put(key, points.clone()).await;
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::get_series;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(symbol: &str, mock_response: &str) -> wiremock::MockServer {
        let mock_server = wiremock::MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(mock_server: &MockServer) -> YahooSeriesProvider {
        YahooSeriesProvider::new(&mock_server.uri(), Arc::new(Cache::new())).with_retry_policy(0, 1)
    }

    fn nvda() -> Symbol {
        Symbol::parse("NVDA").unwrap()
    }

    // 2026-10-14, 2026-10-15 and 2026-10-16 at 13:30 UTC
    const THREE_DAYS: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "gmtoffset": -14400},
                "timestamp": [1791984600, 1792071000, 1792157400],
                "indicators": {
                    "quote": [{
                        "open": [100.0, 104.0, 108.0],
                        "high": [105.0, 109.0, 112.0],
                        "low": [99.0, 103.0, 107.0],
                        "close": [104.0, 108.0, 110.0],
                        "volume": [1000, 1200, 900]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[tokio::test]
    async fn test_successful_series_fetch() {
        let mock_server = create_mock_server("NVDA", THREE_DAYS).await;
        let points = provider(&mock_server)
            .fetch_series(&nvda(), SeriesRange::OneMonth)
            .await
            .unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].time, "2026-10-14");
        assert_eq!(points[2].time, "2026-10-16");
        assert_eq!(points[2].close, Some(RawNumber::Number(110.0)));
        assert_eq!(points[1].volume, Some(RawNumber::Number(1200.0)));
    }

    #[tokio::test]
    async fn test_range_is_passed_through() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .and(query_param("range", "ytd"))
            .respond_with(ResponseTemplate::new(200).set_body_string(THREE_DAYS))
            .expect(1)
            .mount(&mock_server)
            .await;

        let points = provider(&mock_server)
            .fetch_series(&nvda(), SeriesRange::YearToDate)
            .await
            .unwrap();
        assert_eq!(points.len(), 3);
    }

    #[tokio::test]
    async fn test_null_bars_are_dropped_on_normalization() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": 0},
                    "timestamp": [1791984600, 1792071000],
                    "indicators": {
                        "quote": [{
                            "open": [100.0, null],
                            "high": [105.0, null],
                            "low": [99.0, null],
                            "close": [104.0, null],
                            "volume": [1000, null]
                        }]
                    }
                }]
            }
        }"#;
        let mock_server = create_mock_server("NVDA", mock_response).await;
        let report = get_series(&provider(&mock_server), &nvda(), SeriesRange::OneYear)
            .await
            .unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(report.series.closes(), vec![104.0]);
    }

    #[tokio::test]
    async fn test_repeated_fetch_is_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .respond_with(ResponseTemplate::new(200).set_body_string(THREE_DAYS))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        for _ in 0..2 {
            let points = provider
                .fetch_series(&nvda(), SeriesRange::OneYear)
                .await
                .unwrap();
            assert_eq!(points.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_no_series_result_data() {
        let mock_response = r#"{"chart": {"result": []}}"#;
        let mock_server = create_mock_server("INVALID", mock_response).await;

        let symbol = Symbol::parse("INVALID").unwrap();
        let result = provider(&mock_server)
            .fetch_series(&symbol, SeriesRange::OneYear)
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No series data found for symbol: INVALID"
        );
    }

    #[tokio::test]
    async fn test_result_without_timestamps_is_an_error_and_not_cached() {
        let mock_response = r#"{
            "chart": {
                "result": [{"meta": {"gmtoffset": -14400}, "indicators": {"quote": [{}]}}],
                "error": null
            }
        }"#;
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .expect(2)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        for _ in 0..2 {
            let result = provider.fetch_series(&nvda(), SeriesRange::OneMonth).await;
            assert_eq!(
                result.unwrap_err().to_string(),
                "No series data found for symbol: NVDA"
            );
        }
    }

    #[tokio::test]
    async fn test_yahoo_error_payload() {
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;
        let mock_server = create_mock_server("NVDA", mock_response).await;
        let result = provider(&mock_server)
            .fetch_series(&nvda(), SeriesRange::OneYear)
            .await;
        assert!(result.unwrap_err().to_string().contains("Not Found"));
    }

    #[tokio::test]
    async fn test_yahoo_api_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .fetch_series(&nvda(), SeriesRange::OneYear)
            .await;
        let message = result.unwrap_err().to_string();
        assert!(message.starts_with("Request error:"), "{message}");
        assert!(message.contains("500"), "{message}");
    }

    #[tokio::test]
    async fn test_yahoo_api_malformed_response() {
        let mock_response = r#"{"chart": []}"#;
        let mock_server = create_mock_server("NVDA", mock_response).await;
        let result = provider(&mock_server)
            .fetch_series(&nvda(), SeriesRange::OneYear)
            .await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for NVDA")
        );
    }
}
