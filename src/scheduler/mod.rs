//! 定时任务：任务清单、带超时的执行包装、各任务实现

pub mod execution;
pub mod feed_crawl_job;
pub mod price_refresh_job;
pub mod registry;
pub mod roster_sync_job;
pub mod split_refresh_job;

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::repositories::{JobHistoryStore, MarketStore};
use crate::services::feed_collector::FeedCollector;
use crate::services::market_data::MarketDataClient;
use crate::services::mention_extractor::MentionExtractor;
use crate::services::roster::RosterClient;

pub use execution::{run_guarded, JobReport, RunStatus};
pub use registry::{JobKind, JobRegistry, JobSpec};

/// 任务运行所需的共享依赖
pub struct JobContext {
    pub store: Arc<dyn MarketStore>,
    pub history: Arc<dyn JobHistoryStore>,
    pub market: Arc<MarketDataClient>,
    pub roster: Arc<RosterClient>,
    pub feed: Arc<FeedCollector>,
    pub extractor: Arc<dyn MentionExtractor>,
    pub lookback: chrono::Duration,
    pub ticker_delay: Duration,
}

impl JobContext {
    pub async fn run(&self, kind: &JobKind) -> anyhow::Result<JobReport> {
        match kind {
            JobKind::RosterSync => roster_sync_job::run_roster_sync(&*self.store, &self.roster).await,
            JobKind::PriceRefresh => {
                price_refresh_job::run_price_refresh(&*self.store, &self.market, self.ticker_delay).await
            }
            JobKind::SplitRefresh => {
                split_refresh_job::run_split_refresh(&*self.store, &self.market, self.ticker_delay).await
            }
            JobKind::FeedCrawl { source } => {
                feed_crawl_job::run_feed_crawl(&self.feed, &*self.extractor, source, self.lookback).await
            }
        }
    }
}

pub async fn execute(spec: &JobSpec, ctx: Arc<JobContext>) -> RunStatus {
    let kind = spec.kind.clone();
    let history = ctx.history.clone();
    run_guarded(&spec.name, spec.deadline, history, async move { ctx.run(&kind).await }).await
}

fn repeating_job(spec: JobSpec, ctx: Arc<JobContext>) -> Result<Job, JobSchedulerError> {
    Job::new_repeated_async(spec.interval, move |_uuid, _scheduler| {
        let spec = spec.clone();
        let ctx = ctx.clone();
        Box::pin(async move {
            execute(&spec, ctx).await;
        })
    })
}

/// 到达错峰时间后先注册周期任务，再执行首轮
async fn register_staggered(
    scheduler: &JobScheduler,
    spec: JobSpec,
    ctx: Arc<JobContext>,
) -> Result<(), JobSchedulerError> {
    let name = spec.name.clone();
    let first_run_after = spec.first_run_after;
    let interval = spec.interval;

    let first = Job::new_one_shot_async(first_run_after, move |_uuid, scheduler| {
        let spec = spec.clone();
        let ctx = ctx.clone();
        Box::pin(async move {
            match repeating_job(spec.clone(), ctx.clone()) {
                Ok(job) => {
                    if let Err(e) = scheduler.add(job).await {
                        tracing::error!("注册周期任务 {} 失败: {}", spec.name, e);
                    }
                }
                Err(e) => tracing::error!("创建周期任务 {} 失败: {}", spec.name, e),
            }
            execute(&spec, ctx).await;
        })
    })?;
    scheduler.add(first).await?;

    tracing::info!(
        "定时任务 {} 已注册（首次 {}s 后执行，之后每 {}s 执行一次）",
        name,
        first_run_after.as_secs(),
        interval.as_secs()
    );
    Ok(())
}

pub async fn start_jobs(registry: &JobRegistry, ctx: Arc<JobContext>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    for spec in registry.jobs() {
        register_staggered(&scheduler, spec.clone(), ctx.clone()).await?;
    }
    scheduler.start().await?;
    tracing::info!("调度器已启动，共 {} 个任务", registry.jobs().len());
    Ok(scheduler)
}
