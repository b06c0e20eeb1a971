use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use serde_json::json;
use tokio::time::sleep;

use super::execution::{JobReport, LOGGED_ERROR_LIMIT, PROGRESS_EVERY};
use crate::models::NewStockSplit;
use crate::repositories::MarketStore;
use crate::services::market_data::MarketDataClient;

/// 拉取每只股票的拆股历史，已存在的拆股记录会被忽略
pub async fn run_split_refresh(
    store: &dyn MarketStore,
    market: &MarketDataClient,
    ticker_delay: Duration,
) -> anyhow::Result<JobReport> {
    let tickers = store.list_tickers().await?;
    let total = tickers.len();
    tracing::info!("开始检查 {} 只股票的拆股记录", total);

    let mut report = JobReport {
        total,
        ..Default::default()
    };
    let (mut stored, mut known) = (0usize, 0usize);
    let (mut fetch_errors, mut insert_errors) = (0usize, 0usize);

    for (index, ticker) in tickers.iter().enumerate() {
        if !ticker.is_tradable() {
            report.skipped += 1;
            continue;
        }

        if index > 0 && index % PROGRESS_EVERY == 0 {
            tracing::info!(
                "拆股检查进度 {}/{}，新增 {}，拉取失败 {}，写入失败 {}",
                index,
                total,
                stored,
                fetch_errors,
                insert_errors
            );
        }

        let fetched = market.splits(&ticker.symbol).await;
        sleep(ticker_delay).await;

        let splits = match fetched {
            Ok(splits) => splits,
            Err(e) => {
                fetch_errors += 1;
                report.failed += 1;
                if fetch_errors <= LOGGED_ERROR_LIMIT {
                    tracing::warn!("获取 {} 拆股记录失败: {}", ticker.symbol, e);
                }
                continue;
            }
        };

        let mut ticker_ok = true;
        for split in splits {
            tracing::debug!(
                "{} 拆股 {} 比例 {:.4}",
                ticker.symbol,
                split.date.format("%Y-%m-%d"),
                split.ratio
            );
            let Ok(ratio) = BigDecimal::from_str(&format!("{:.4}", split.ratio)) else {
                insert_errors += 1;
                ticker_ok = false;
                continue;
            };
            let record = NewStockSplit {
                ticker_id: ticker.id,
                ratio,
                effective_date: split.date,
            };
            match store.insert_split(record).await {
                Ok(true) => stored += 1,
                Ok(false) => known += 1,
                Err(e) => {
                    tracing::error!("写入 {} 拆股记录失败: {}", ticker.symbol, e);
                    insert_errors += 1;
                    ticker_ok = false;
                }
            }
        }

        if ticker_ok {
            report.success += 1;
        } else {
            report.failed += 1;
        }
    }

    tracing::info!(
        "拆股检查完成，新增 {}，已存在 {}，拉取失败 {}，写入失败 {}（共 {} 只）",
        stored,
        known,
        fetch_errors,
        insert_errors,
        total
    );
    report.details = Some(json!({
        "splits_stored": stored,
        "already_known": known,
        "fetch_errors": fetch_errors,
        "insert_errors": insert_errors,
    }));
    Ok(report)
}
