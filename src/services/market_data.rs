use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::utils::http_client::{Fetch, FetchError};

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
/// Historical quotes look back this far from the requested instant.
const HISTORY_WINDOW_HOURS: i64 = 2;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Transport(reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("provider error {code}: {description}")]
    Upstream { code: String, description: String },
    #[error("no data returned")]
    EmptyResult,
    #[error("invalid or missing field: {0}")]
    InvalidField(&'static str),
}

impl From<FetchError> for MarketDataError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(e) => MarketDataError::Transport(e),
            FetchError::Status(code) => MarketDataError::Status(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub volume: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitEvent {
    pub symbol: String,
    pub date: DateTime<Utc>,
    /// denominator / numerator: a 2-for-1 split yields 0.5.
    pub ratio: f64,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Indicators,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    regular_market_volume: Option<i64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    splits: HashMap<String, RawSplit>,
}

#[derive(Debug, Deserialize)]
struct RawSplit {
    date: i64,
    numerator: f64,
    denominator: f64,
}

fn parse_chart(body: &str) -> Result<Option<ChartResult>, MarketDataError> {
    let response: ChartResponse = serde_json::from_str(body)?;
    if let Some(err) = response.chart.error {
        return Err(MarketDataError::Upstream {
            code: err.code,
            description: err.description,
        });
    }
    Ok(response.chart.result.and_then(|results| results.into_iter().next()))
}

fn parse_current_quote(symbol: &str, body: &str) -> Result<Quote, MarketDataError> {
    let result = parse_chart(body)?.ok_or(MarketDataError::EmptyResult)?;
    let meta = result.meta;

    let price = meta
        .regular_market_price
        .filter(|p| *p != 0.0)
        .ok_or(MarketDataError::InvalidField("regularMarketPrice"))?;

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        volume: meta.regular_market_volume.unwrap_or(0),
        timestamp: meta
            .regular_market_time
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now),
    })
}

fn parse_historical_quote(symbol: &str, at: DateTime<Utc>, body: &str) -> Result<Quote, MarketDataError> {
    let result = parse_chart(body)?.ok_or(MarketDataError::EmptyResult)?;
    let series = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or(MarketDataError::EmptyResult)?;

    let close = series.close.first().ok_or(MarketDataError::EmptyResult)?;
    let price = close.ok_or(MarketDataError::InvalidField("close"))?;
    let volume = series.volume.first().copied().flatten().unwrap_or(0);
    let timestamp = result
        .timestamp
        .and_then(|ts| ts.first().copied())
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .unwrap_or(at);

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        volume,
        timestamp,
    })
}

fn parse_splits(symbol: &str, body: &str) -> Result<Vec<SplitEvent>, MarketDataError> {
    let Some(result) = parse_chart(body)? else {
        return Ok(Vec::new());
    };
    let Some(events) = result.events else {
        return Ok(Vec::new());
    };

    Ok(events
        .splits
        .into_values()
        .filter(|split| split.numerator != 0.0)
        .filter_map(|split| {
            let date = DateTime::from_timestamp(split.date, 0)?;
            Some(SplitEvent {
                symbol: symbol.to_string(),
                date,
                ratio: split.denominator / split.numerator,
            })
        })
        .collect())
}

/// Yahoo chart API 封装：实时报价、历史收盘价、拆股事件
pub struct MarketDataClient {
    fetcher: Arc<dyn Fetch>,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            base_url: YAHOO_CHART_URL.to_string(),
        }
    }

    pub async fn current_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let url = format!("{}/{}?range=1d&interval=1d", self.base_url, symbol);
        let body = self.fetcher.get_text(&url).await?;
        parse_current_quote(symbol, &body)
    }

    pub async fn historical_quote(&self, symbol: &str, at: DateTime<Utc>) -> Result<Quote, MarketDataError> {
        let start = at - Duration::hours(HISTORY_WINDOW_HOURS);
        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d",
            self.base_url,
            symbol,
            start.timestamp(),
            at.timestamp()
        );
        let body = self.fetcher.get_text(&url).await?;
        parse_historical_quote(symbol, at, &body)
    }

    /// Full split history; order is whatever the provider map yields.
    pub async fn splits(&self, symbol: &str) -> Result<Vec<SplitEvent>, MarketDataError> {
        let url = format!("{}/{}?range=max&interval=1d&events=splits", self.base_url, symbol);
        let body = self.fetcher.get_text(&url).await?;
        parse_splits(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::http_client::testing::ScriptedFetch;
    use serde_json::json;

    fn client(fetch: ScriptedFetch) -> MarketDataClient {
        MarketDataClient::new(Arc::new(fetch))
    }

    fn chart(result: serde_json::Value) -> String {
        json!({ "chart": { "result": [result], "error": null } }).to_string()
    }

    #[tokio::test]
    async fn current_quote_reads_regular_market_price() {
        let body = chart(json!({
            "meta": { "regularMarketPrice": 182.5, "regularMarketVolume": 1200, "regularMarketTime": 1700000000 }
        }));
        let quote = client(ScriptedFetch::new().respond("AAPL?range=1d", body))
            .current_quote("AAPL")
            .await
            .unwrap();

        assert_eq!(quote.price, 182.5);
        assert_eq!(quote.volume, 1200);
        assert_eq!(quote.timestamp.timestamp(), 1700000000);
    }

    #[tokio::test]
    async fn zero_or_missing_price_is_invalid() {
        for meta in [json!({ "regularMarketPrice": 0.0 }), json!({})] {
            let body = chart(json!({ "meta": meta }));
            let err = client(ScriptedFetch::new().respond("AAPL", body))
                .current_quote("AAPL")
                .await
                .unwrap_err();
            assert!(matches!(err, MarketDataError::InvalidField("regularMarketPrice")));
        }
    }

    #[tokio::test]
    async fn provider_error_object_is_surfaced() {
        let body = json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" } }
        })
        .to_string();
        let err = client(ScriptedFetch::new().respond("ZZZZ", body))
            .current_quote("ZZZZ")
            .await
            .unwrap_err();

        match err {
            MarketDataError::Upstream { code, description } => {
                assert_eq!(code, "Not Found");
                assert!(description.contains("delisted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_kinds_stay_distinct() {
        let status = client(ScriptedFetch::new().fail("AAPL", StatusCode::TOO_MANY_REQUESTS))
            .current_quote("AAPL")
            .await
            .unwrap_err();
        assert!(matches!(status, MarketDataError::Status(code) if code == StatusCode::TOO_MANY_REQUESTS));

        let decode = client(ScriptedFetch::new().respond("AAPL", "Too Many Requests"))
            .current_quote("AAPL")
            .await
            .unwrap_err();
        assert!(matches!(decode, MarketDataError::Decode(_)));

        let empty = client(ScriptedFetch::new().respond("AAPL", json!({ "chart": { "result": [] } }).to_string()))
            .current_quote("AAPL")
            .await
            .unwrap_err();
        assert!(matches!(empty, MarketDataError::EmptyResult));
    }

    #[tokio::test]
    async fn historical_quote_takes_first_close() {
        let at = DateTime::from_timestamp(1700007200, 0).unwrap();
        let body = chart(json!({
            "meta": {},
            "timestamp": [1700003600, 1700007200],
            "indicators": { "quote": [{ "close": [41.25, 42.0], "volume": [null, 10] }] }
        }));
        let fetch = Arc::new(ScriptedFetch::new().respond("period1=1700000000&period2=1700007200", body));
        let quote = MarketDataClient::new(fetch.clone())
            .historical_quote("AMD", at)
            .await
            .unwrap();

        assert_eq!(quote.price, 41.25);
        assert_eq!(quote.volume, 0);
        assert_eq!(quote.timestamp.timestamp(), 1700003600);
        assert_eq!(fetch.requested().len(), 1);
    }

    #[tokio::test]
    async fn historical_quote_edge_cases() {
        let at = Utc::now();

        let null_close = chart(json!({ "indicators": { "quote": [{ "close": [null] }] } }));
        let err = client(ScriptedFetch::new().respond("AMD", null_close))
            .historical_quote("AMD", at)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidField("close")));

        let no_close = chart(json!({ "indicators": { "quote": [{ "close": [] }] } }));
        let err = client(ScriptedFetch::new().respond("AMD", no_close))
            .historical_quote("AMD", at)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyResult));

        let no_timestamp = chart(json!({ "indicators": { "quote": [{ "close": [3.5] }] } }));
        let quote = client(ScriptedFetch::new().respond("AMD", no_timestamp))
            .historical_quote("AMD", at)
            .await
            .unwrap();
        assert_eq!(quote.timestamp, at);
    }

    #[tokio::test]
    async fn splits_invert_provider_ratio() {
        let body = chart(json!({
            "meta": {},
            "events": { "splits": {
                "1598832000": { "date": 1598832000, "numerator": 4.0, "denominator": 1.0, "splitRatio": "4:1" },
                "1000000000": { "date": 1000000000, "numerator": 0.0, "denominator": 1.0, "splitRatio": "0:1" }
            } }
        }));
        let splits = client(ScriptedFetch::new().respond("events=splits", body))
            .splits("AAPL")
            .await
            .unwrap();

        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].ratio, 0.25);
        assert_eq!(splits[0].date.timestamp(), 1598832000);
    }

    #[tokio::test]
    async fn missing_split_events_is_empty() {
        let no_events = chart(json!({ "meta": {} }));
        assert!(client(ScriptedFetch::new().respond("events=splits", no_events))
            .splits("MSFT")
            .await
            .unwrap()
            .is_empty());

        let no_result = json!({ "chart": { "result": null } }).to_string();
        assert!(client(ScriptedFetch::new().respond("events=splits", no_result))
            .splits("MSFT")
            .await
            .unwrap()
            .is_empty());
    }
}
