//! 持久层：diesel 查询函数 + 面向服务层的异步仓储接口

pub mod job_execution_history;
pub mod mention_query;
pub mod mentions;
pub mod pg_store;
pub mod stock_splits;
pub mod ticker_prices;
pub mod tickers;
pub mod visitors;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    JobExecutionHistory, NewJobExecutionHistory, NewMention, NewStockSplit, NewTicker, NewTickerPrice,
    NewVisitor, Ticker, UpdateJobExecutionHistory,
};

pub use job_execution_history::HistoryFilter;
pub use mention_query::PickRow;
pub use pg_store::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("query error: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 行情任务与提及抽取写入的数据
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn list_tickers(&self) -> Result<Vec<Ticker>, StoreError>;

    async fn find_ticker(&self, symbol: &str) -> Result<Option<Ticker>, StoreError>;

    async fn upsert_ticker(&self, ticker: NewTicker) -> Result<Ticker, StoreError>;

    async fn insert_price(&self, price: NewTickerPrice) -> Result<(), StoreError>;

    /// Returns false when the split was already stored.
    async fn insert_split(&self, split: NewStockSplit) -> Result<bool, StoreError>;

    /// Returns false when the mention was already stored.
    async fn insert_mention(&self, mention: NewMention) -> Result<bool, StoreError>;
}

/// 排行接口读取的数据，每行已带累计拆股系数
#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn user_mentions(&self, username: &str) -> Result<Vec<PickRow>, StoreError>;

    /// Earliest mention per symbol since `cutoff`, excluded users left out first.
    async fn earliest_picks_since(
        &self,
        cutoff: DateTime<Utc>,
        excluded: &'static [&'static str],
    ) -> Result<Vec<PickRow>, StoreError>;

    /// Earliest mention per (user, symbol) since `cutoff`.
    async fn user_picks_since(
        &self,
        cutoff: DateTime<Utc>,
        excluded: &'static [&'static str],
    ) -> Result<Vec<PickRow>, StoreError>;
}

#[async_trait]
pub trait VisitStore: Send + Sync {
    async fn record_visit(&self, visit: NewVisitor) -> Result<(), StoreError>;
}

#[async_trait]
pub trait JobHistoryStore: Send + Sync {
    async fn start_run(&self, run: NewJobExecutionHistory) -> Result<i32, StoreError>;

    async fn finish_run(&self, id: i32, update: UpdateJobExecutionHistory) -> Result<(), StoreError>;

    async fn list_runs(&self, filter: HistoryFilter) -> Result<(Vec<JobExecutionHistory>, i64), StoreError>;
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;

    /// In-memory stand-in for `PgStore`.
    #[derive(Default)]
    pub struct MemoryStore {
        pub tickers: Mutex<Vec<Ticker>>,
        pub prices: Mutex<Vec<NewTickerPrice>>,
        pub splits: Mutex<Vec<NewStockSplit>>,
        pub mentions: Mutex<Vec<NewMention>>,
        pub picks: Mutex<Vec<PickRow>>,
        pub visits: Mutex<Vec<NewVisitor>>,
        pub runs: Mutex<Vec<JobExecutionHistory>>,
        /// Symbols whose price and split inserts fail.
        pub failing_symbols: Mutex<HashSet<String>>,
        pub fail_reads: bool,
    }

    impl MemoryStore {
        pub fn with_tickers(symbols: &[&str]) -> Self {
            let store = Self::default();
            {
                let mut tickers = store.tickers.lock().unwrap();
                for (i, s) in symbols.iter().enumerate() {
                    tickers.push(ticker(i as i32 + 1, s));
                }
            }
            store
        }

        /// Same filtering and DISTINCT ON semantics as the SQL reads.
        fn distinct_since(
            &self,
            cutoff: DateTime<Utc>,
            excluded: &[&str],
            key: impl Fn(&PickRow) -> String,
        ) -> Result<Vec<PickRow>, StoreError> {
            if self.fail_reads {
                return Err(read_failure());
            }
            let mut rows: Vec<PickRow> = self
                .picks
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.mentioned_at >= cutoff && !excluded.contains(&p.username.as_str()))
                .cloned()
                .collect();
            rows.sort_by(|a, b| {
                key(a)
                    .cmp(&key(b))
                    .then_with(|| a.mentioned_at.cmp(&b.mentioned_at))
                    .then_with(|| a.username.cmp(&b.username))
            });
            rows.dedup_by(|later, first| key(later) == key(first));
            Ok(rows)
        }

        fn symbol_of(&self, ticker_id: i32) -> Option<String> {
            self.tickers
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == ticker_id)
                .map(|t| t.symbol.clone())
        }
    }

    pub fn ticker(id: i32, symbol: &str) -> Ticker {
        Ticker {
            id,
            symbol: symbol.to_string(),
            company_name: format!("{symbol} Inc."),
            exchange: "NASDAQ".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn read_failure() -> StoreError {
        StoreError::Query(diesel::result::Error::NotFound)
    }

    #[async_trait]
    impl MarketStore for MemoryStore {
        async fn list_tickers(&self) -> Result<Vec<Ticker>, StoreError> {
            if self.fail_reads {
                return Err(read_failure());
            }
            Ok(self.tickers.lock().unwrap().clone())
        }

        async fn find_ticker(&self, symbol: &str) -> Result<Option<Ticker>, StoreError> {
            Ok(self.tickers.lock().unwrap().iter().find(|t| t.symbol == symbol).cloned())
        }

        async fn upsert_ticker(&self, new_ticker: NewTicker) -> Result<Ticker, StoreError> {
            let mut tickers = self.tickers.lock().unwrap();
            if let Some(existing) = tickers.iter_mut().find(|t| t.symbol == new_ticker.symbol) {
                existing.company_name = new_ticker.company_name;
                existing.exchange = new_ticker.exchange;
                return Ok(existing.clone());
            }
            let created = Ticker {
                company_name: new_ticker.company_name,
                exchange: new_ticker.exchange,
                ..ticker(tickers.len() as i32 + 1, &new_ticker.symbol)
            };
            tickers.push(created.clone());
            Ok(created)
        }

        async fn insert_price(&self, price: NewTickerPrice) -> Result<(), StoreError> {
            let symbol = self.symbol_of(price.ticker_id).unwrap_or_default();
            if self.failing_symbols.lock().unwrap().contains(&symbol) {
                return Err(StoreError::Query(diesel::result::Error::RollbackTransaction));
            }
            self.prices.lock().unwrap().push(price);
            Ok(())
        }

        async fn insert_split(&self, split: NewStockSplit) -> Result<bool, StoreError> {
            let symbol = self.symbol_of(split.ticker_id).unwrap_or_default();
            if self.failing_symbols.lock().unwrap().contains(&symbol) {
                return Err(StoreError::Query(diesel::result::Error::RollbackTransaction));
            }
            let mut splits = self.splits.lock().unwrap();
            let duplicate = splits
                .iter()
                .any(|s| s.ticker_id == split.ticker_id && s.effective_date == split.effective_date);
            if duplicate {
                return Ok(false);
            }
            splits.push(split);
            Ok(true)
        }

        async fn insert_mention(&self, mention: NewMention) -> Result<bool, StoreError> {
            let mut mentions = self.mentions.lock().unwrap();
            let duplicate = mentions.iter().any(|m| {
                m.source_kind == mention.source_kind
                    && m.source_id == mention.source_id
                    && m.ticker_id == mention.ticker_id
            });
            if duplicate {
                return Ok(false);
            }
            mentions.push(mention);
            Ok(true)
        }
    }

    #[async_trait]
    impl RankingStore for MemoryStore {
        async fn user_mentions(&self, username: &str) -> Result<Vec<PickRow>, StoreError> {
            if self.fail_reads {
                return Err(read_failure());
            }
            Ok(self
                .picks
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.username == username)
                .cloned()
                .collect())
        }

        async fn earliest_picks_since(
            &self,
            cutoff: DateTime<Utc>,
            excluded: &'static [&'static str],
        ) -> Result<Vec<PickRow>, StoreError> {
            self.distinct_since(cutoff, excluded, |p| p.symbol.clone())
        }

        async fn user_picks_since(
            &self,
            cutoff: DateTime<Utc>,
            excluded: &'static [&'static str],
        ) -> Result<Vec<PickRow>, StoreError> {
            self.distinct_since(cutoff, excluded, |p| format!("{}/{}", p.username, p.symbol))
        }
    }

    #[async_trait]
    impl VisitStore for MemoryStore {
        async fn record_visit(&self, visit: NewVisitor) -> Result<(), StoreError> {
            self.visits.lock().unwrap().push(visit);
            Ok(())
        }
    }

    #[async_trait]
    impl JobHistoryStore for MemoryStore {
        async fn start_run(&self, run: NewJobExecutionHistory) -> Result<i32, StoreError> {
            let mut runs = self.runs.lock().unwrap();
            let id = runs.len() as i32 + 1;
            runs.push(JobExecutionHistory {
                id,
                job_name: run.job_name,
                status: run.status,
                started_at: run.started_at,
                completed_at: run.completed_at,
                total_count: run.total_count,
                success_count: run.success_count,
                failed_count: run.failed_count,
                skipped_count: run.skipped_count,
                details: run.details,
                error_message: run.error_message,
                duration_ms: run.duration_ms,
                created_at: Utc::now(),
            });
            Ok(id)
        }

        async fn finish_run(&self, id: i32, update: UpdateJobExecutionHistory) -> Result<(), StoreError> {
            let mut runs = self.runs.lock().unwrap();
            let run = runs
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(StoreError::Query(diesel::result::Error::NotFound))?;
            if let Some(status) = update.status {
                run.status = status;
            }
            run.completed_at = update.completed_at.or(run.completed_at);
            run.total_count = update.total_count.unwrap_or(run.total_count);
            run.success_count = update.success_count.unwrap_or(run.success_count);
            run.failed_count = update.failed_count.unwrap_or(run.failed_count);
            run.skipped_count = update.skipped_count.unwrap_or(run.skipped_count);
            run.details = update.details.or(run.details.take());
            run.error_message = update.error_message.or(run.error_message.take());
            run.duration_ms = update.duration_ms.or(run.duration_ms);
            Ok(())
        }

        async fn list_runs(&self, filter: HistoryFilter) -> Result<(Vec<JobExecutionHistory>, i64), StoreError> {
            let runs = self.runs.lock().unwrap();
            let matching: Vec<JobExecutionHistory> = runs
                .iter()
                .filter(|r| filter.job_name.as_ref().map_or(true, |n| &r.job_name == n))
                .filter(|r| filter.status.as_ref().map_or(true, |s| &r.status == s))
                .cloned()
                .collect();
            let total = matching.len() as i64;
            let items = matching
                .into_iter()
                .skip(((filter.page - 1) * filter.page_size) as usize)
                .take(filter.page_size as usize)
                .collect();
            Ok((items, total))
        }
    }
}
