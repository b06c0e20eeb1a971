use serde_json::json;

use super::execution::JobReport;
use crate::models::{is_tradable_symbol, NewTicker};
use crate::repositories::MarketStore;
use crate::services::roster::{RosterClient, ROSTER_EXCHANGE};

/// 同步交易所股票名录，按代码 upsert
pub async fn run_roster_sync(store: &dyn MarketStore, roster: &RosterClient) -> anyhow::Result<JobReport> {
    tracing::info!("开始同步股票名录");

    let entries = roster.fetch_roster().await?;
    tracing::info!("获取到 {} 只股票", entries.len());

    let mut report = JobReport {
        total: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        if !is_tradable_symbol(&entry.symbol) {
            report.skipped += 1;
            continue;
        }

        let ticker = NewTicker {
            symbol: entry.symbol,
            company_name: entry.name,
            exchange: ROSTER_EXCHANGE.to_string(),
        };
        match store.upsert_ticker(ticker).await {
            Ok(_) => report.success += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!("upsert 股票失败: {}", e);
            }
        }
    }

    tracing::info!(
        "股票名录同步完成，成功: {}，失败: {}，跳过（含 ^ 或 /）: {}",
        report.success,
        report.failed,
        report.skipped
    );
    report.details = Some(json!({ "synced": report.success, "skipped": report.skipped }));
    Ok(report)
}
