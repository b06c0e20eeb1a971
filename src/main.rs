mod api_models;
mod app;
mod handler;
mod models;
mod repositories;
mod routes;
mod scheduler;
mod schema;
mod services;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::repositories::pg_store::build_pool;
use crate::repositories::PgStore;
use crate::scheduler::{JobContext, JobRegistry};
use crate::services::feed_collector::FeedCollector;
use crate::services::market_data::MarketDataClient;
use crate::services::mention_extractor::CashtagExtractor;
use crate::services::roster::RosterClient;
use crate::utils::config::{CrawlConfig, ServerConfig};
use crate::utils::http_client::{create_client, Fetch, HttpFetcher};
use crate::utils::visit_recorder::VisitRecorder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    utils::logging::init_logging();

    let server_cfg = ServerConfig::from_env();
    let crawl_cfg = CrawlConfig::from_env();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let pool = build_pool(&database_url).context("failed to create DB pool")?;
    let store = Arc::new(PgStore::new(pool));

    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(create_client()?));
    let market = Arc::new(MarketDataClient::new(fetcher.clone()));
    let feed = FeedCollector::new(fetcher.clone()).with_delays(crawl_cfg.page_delay, crawl_cfg.post_delay);

    let registry = JobRegistry::standard(&crawl_cfg.sources);
    let ctx = Arc::new(JobContext {
        store: store.clone(),
        history: store.clone(),
        market: market.clone(),
        roster: Arc::new(RosterClient::new(fetcher)),
        feed: Arc::new(feed),
        extractor: Arc::new(CashtagExtractor::new(store.clone(), market)),
        lookback: crawl_cfg.lookback,
        ticker_delay: crawl_cfg.ticker_delay,
    });
    let mut job_scheduler = scheduler::start_jobs(&registry, ctx)
        .await
        .context("failed to start scheduler")?;

    let (visits, visit_worker) = VisitRecorder::spawn(store.clone(), crawl_cfg.visit_queue_capacity);
    let state = app::AppState {
        ranking_store: store.clone(),
        job_history: store,
        jobs: Arc::new(registry.job_infos()),
    };
    let app = app::build_app(state, visits);

    let listener = tokio::net::TcpListener::bind(server_cfg.addr)
        .await
        .with_context(|| format!("bind {} failed", server_cfg.addr))?;
    tracing::info!("Axum listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("正在停止调度器");
    if let Err(e) = job_scheduler.shutdown().await {
        tracing::warn!("停止调度器失败: {}", e);
    }
    visit_worker.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
