use std::sync::Arc;

use serde::Deserialize;

use super::market_data::MarketDataError;
use crate::utils::http_client::Fetch;

const NASDAQ_SCREENER_URL: &str =
    "https://api.nasdaq.com/api/screener/stocks?tableonly=true&exchange=nasdaq&download=true";

pub const ROSTER_EXCHANGE: &str = "NASDAQ";

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ScreenerResponse {
    #[serde(default)]
    data: Option<ScreenerData>,
}

#[derive(Debug, Deserialize)]
struct ScreenerData {
    #[serde(default)]
    rows: Option<Vec<ScreenerRow>>,
}

#[derive(Debug, Deserialize)]
struct ScreenerRow {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
}

/// 交易所股票名录（NASDAQ screener）
pub struct RosterClient {
    fetcher: Arc<dyn Fetch>,
    url: String,
}

impl RosterClient {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            url: NASDAQ_SCREENER_URL.to_string(),
        }
    }

    pub async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, MarketDataError> {
        let body = self.fetcher.get_text(&self.url).await?;
        let response: ScreenerResponse = serde_json::from_str(&body)?;
        let rows = response
            .data
            .and_then(|data| data.rows)
            .ok_or(MarketDataError::EmptyResult)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let symbol = row.symbol.trim().to_string();
                if symbol.is_empty() {
                    return None;
                }
                Some(RosterEntry {
                    symbol,
                    name: row.name.trim().to_string(),
                })
            })
            .collect())
    }
}
