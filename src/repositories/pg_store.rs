use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

use super::{
    job_execution_history, mention_query, mentions, stock_splits, ticker_prices, tickers, visitors,
    HistoryFilter, JobHistoryStore, MarketStore, PickRow, RankingStore, StoreError, VisitStore,
};
use crate::models::{
    JobExecutionHistory, NewJobExecutionHistory, NewMention, NewStockSplit, NewTicker, NewTickerPrice,
    NewVisitor, Ticker, UpdateJobExecutionHistory,
};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn build_pool(database_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

/// 基于 r2d2 连接池的仓储实现
///
/// diesel 是同步接口，查询统一放到 spawn_blocking 中执行，避免阻塞 HTTP 与定时任务
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, diesel::result::Error> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn).map_err(StoreError::from)
        })
        .await?
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn list_tickers(&self) -> Result<Vec<Ticker>, StoreError> {
        self.with_conn(tickers::list_all).await
    }

    async fn find_ticker(&self, symbol: &str) -> Result<Option<Ticker>, StoreError> {
        let symbol = symbol.to_string();
        self.with_conn(move |conn| tickers::find_by_symbol(conn, &symbol)).await
    }

    async fn upsert_ticker(&self, ticker: NewTicker) -> Result<Ticker, StoreError> {
        self.with_conn(move |conn| tickers::upsert(conn, &ticker)).await
    }

    async fn insert_price(&self, price: NewTickerPrice) -> Result<(), StoreError> {
        self.with_conn(move |conn| ticker_prices::create(conn, &price).map(|_| ()))
            .await
    }

    async fn insert_split(&self, split: NewStockSplit) -> Result<bool, StoreError> {
        self.with_conn(move |conn| stock_splits::create_if_absent(conn, &split))
            .await
    }

    async fn insert_mention(&self, mention: NewMention) -> Result<bool, StoreError> {
        self.with_conn(move |conn| mentions::create_if_absent(conn, &mention))
            .await
    }
}

#[async_trait]
impl RankingStore for PgStore {
    async fn user_mentions(&self, username: &str) -> Result<Vec<PickRow>, StoreError> {
        let username = username.to_string();
        self.with_conn(move |conn| mention_query::user_earliest_mentions(conn, &username))
            .await
    }

    async fn earliest_picks_since(
        &self,
        cutoff: DateTime<Utc>,
        excluded: &'static [&'static str],
    ) -> Result<Vec<PickRow>, StoreError> {
        self.with_conn(move |conn| mention_query::earliest_picks_since(conn, cutoff, excluded))
            .await
    }

    async fn user_picks_since(
        &self,
        cutoff: DateTime<Utc>,
        excluded: &'static [&'static str],
    ) -> Result<Vec<PickRow>, StoreError> {
        self.with_conn(move |conn| mention_query::user_picks_since(conn, cutoff, excluded))
            .await
    }
}

#[async_trait]
impl VisitStore for PgStore {
    async fn record_visit(&self, visit: NewVisitor) -> Result<(), StoreError> {
        self.with_conn(move |conn| visitors::create(conn, &visit).map(|_| ()))
            .await
    }
}

#[async_trait]
impl JobHistoryStore for PgStore {
    async fn start_run(&self, run: NewJobExecutionHistory) -> Result<i32, StoreError> {
        self.with_conn(move |conn| job_execution_history::create(conn, &run).map(|h| h.id))
            .await
    }

    async fn finish_run(&self, id: i32, update: UpdateJobExecutionHistory) -> Result<(), StoreError> {
        self.with_conn(move |conn| job_execution_history::update(conn, id, &update).map(|_| ()))
            .await
    }

    async fn list_runs(&self, filter: HistoryFilter) -> Result<(Vec<JobExecutionHistory>, i64), StoreError> {
        self.with_conn(move |conn| job_execution_history::paginate(conn, &filter))
            .await
    }
}
