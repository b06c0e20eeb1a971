use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::time::sleep;

use super::execution::{JobReport, LOGGED_ERROR_LIMIT, PROGRESS_EVERY};
use crate::models::NewTickerPrice;
use crate::repositories::MarketStore;
use crate::services::market_data::MarketDataClient;
use crate::utils::bigdecimal_parser::decimal_from_f64;

/// 逐只刷新最新价格，单只失败只计数不中断
pub async fn run_price_refresh(
    store: &dyn MarketStore,
    market: &MarketDataClient,
    ticker_delay: Duration,
) -> anyhow::Result<JobReport> {
    let tickers = store.list_tickers().await?;
    let total = tickers.len();
    tracing::info!("开始刷新 {} 只股票的价格", total);

    let now = Utc::now();
    let mut report = JobReport {
        total,
        ..Default::default()
    };
    let mut error_symbols: Vec<String> = Vec::new();

    for (index, ticker) in tickers.iter().enumerate() {
        if !ticker.is_tradable() {
            report.skipped += 1;
            continue;
        }

        if index > 0 && index % PROGRESS_EVERY == 0 {
            tracing::info!(
                "价格刷新进度 {}/{}，成功 {}，失败 {}",
                index,
                total,
                report.success,
                error_symbols.len()
            );
        }

        let fetched = market.historical_quote(&ticker.symbol, now).await;
        sleep(ticker_delay).await;

        let quote = match fetched {
            Ok(quote) => quote,
            Err(e) => {
                if error_symbols.len() < LOGGED_ERROR_LIMIT {
                    tracing::warn!("获取 {} 价格失败: {}", ticker.symbol, e);
                }
                error_symbols.push(ticker.symbol.clone());
                continue;
            }
        };

        let Some(price) = decimal_from_f64(quote.price) else {
            tracing::warn!("{} 价格无效: {}", ticker.symbol, quote.price);
            error_symbols.push(ticker.symbol.clone());
            continue;
        };

        let observation = NewTickerPrice {
            ticker_id: ticker.id,
            price,
            volume: quote.volume,
            recorded_at: quote.timestamp,
        };
        match store.insert_price(observation).await {
            Ok(()) => report.success += 1,
            Err(e) => {
                tracing::error!("写入 {} (ticker_id={}) 价格失败: {}", ticker.symbol, ticker.id, e);
                error_symbols.push(ticker.symbol.clone());
            }
        }
    }

    report.failed = error_symbols.len();
    tracing::info!("价格刷新完成，成功 {}，失败 {}", report.success, report.failed);
    if !error_symbols.is_empty() {
        tracing::info!("失败代码: {:?}", error_symbols);
    }
    report.details = Some(json!({ "error_symbols": error_symbols }));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::testing::MemoryStore;
    use crate::utils::http_client::testing::ScriptedFetch;
    use reqwest::StatusCode;
    use std::sync::Arc;

    fn close(price: f64) -> String {
        json!({ "chart": { "result": [{
            "timestamp": [1700000000],
            "indicators": { "quote": [{ "close": [price], "volume": [5000] }] }
        }] } })
        .to_string()
    }

    #[tokio::test]
    async fn continues_past_failures_and_skips_markers() {
        let store = MemoryStore::with_tickers(&["AAPL", "^GSPC", "BRK/A", "MSFT", "TSLA"]);
        store.failing_symbols.lock().unwrap().insert("TSLA".to_string());
        let fetch = Arc::new(
            ScriptedFetch::new()
                .respond("/AAPL?", close(189.25))
                .fail("/MSFT?", StatusCode::INTERNAL_SERVER_ERROR)
                .respond("/TSLA?", close(250.0)),
        );
        let market = MarketDataClient::new(fetch.clone());

        let report = run_price_refresh(&store, &market, Duration::ZERO).await.unwrap();

        assert_eq!((report.success, report.failed, report.skipped), (1, 2, 2));
        let prices = store.prices.lock().unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].ticker_id, 1);
        assert_eq!(prices[0].volume, 5000);
        assert_eq!(prices[0].recorded_at.timestamp(), 1700000000);

        let requested = fetch.requested();
        assert_eq!(requested.len(), 3);
        assert!(requested.iter().all(|url| !url.contains('^') && !url.contains("BRK")));
        assert_eq!(report.details.unwrap()["error_symbols"], json!(["MSFT", "TSLA"]));
    }

    #[tokio::test]
    async fn unreadable_roster_fails_the_run() {
        let store = MemoryStore {
            fail_reads: true,
            ..Default::default()
        };
        let market = MarketDataClient::new(Arc::new(ScriptedFetch::new()));

        assert!(run_price_refresh(&store, &market, Duration::ZERO).await.is_err());
    }
}
