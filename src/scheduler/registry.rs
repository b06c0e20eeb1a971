use std::time::Duration;

use crate::api_models::scheduler::JobInfo;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Gap between consecutive feed sources' first runs.
const FEED_STAGGER: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    RosterSync,
    PriceRefresh,
    SplitRefresh,
    FeedCrawl { source: String },
}

#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub interval: Duration,
    pub first_run_after: Duration,
    pub deadline: Duration,
    pub kind: JobKind,
}

impl JobSpec {
    pub fn info(&self) -> JobInfo {
        JobInfo {
            name: self.name.clone(),
            interval_secs: self.interval.as_secs(),
            first_run_offset_secs: self.first_run_after.as_secs(),
            deadline_secs: self.deadline.as_secs(),
        }
    }
}

/// 启动时构建一次的任务清单，交给调度器注册
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Vec<JobSpec>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, spec: JobSpec) -> Self {
        self.jobs.push(spec);
        self
    }

    /// 名录每日同步、价格每 2 小时、拆股每 12 小时、每个社区每小时抓取一次（错开 15 分钟）
    pub fn standard(sources: &[String]) -> Self {
        let mut registry = Self::new()
            .register(JobSpec {
                name: "ticker-roster-sync".to_string(),
                interval: 24 * HOUR,
                first_run_after: Duration::from_secs(5),
                deadline: 5 * MINUTE,
                kind: JobKind::RosterSync,
            })
            .register(JobSpec {
                name: "ticker-prices".to_string(),
                interval: 2 * HOUR,
                first_run_after: 2 * HOUR,
                deadline: 30 * MINUTE,
                kind: JobKind::PriceRefresh,
            })
            .register(JobSpec {
                name: "stock-splits".to_string(),
                interval: 12 * HOUR,
                first_run_after: 12 * HOUR,
                deadline: 30 * MINUTE,
                kind: JobKind::SplitRefresh,
            });

        for (index, source) in sources.iter().enumerate() {
            registry = registry.register(JobSpec {
                name: format!("feed-crawl-{}", source),
                interval: HOUR,
                first_run_after: HOUR + FEED_STAGGER * index as u32,
                deadline: 30 * MINUTE,
                kind: JobKind::FeedCrawl {
                    source: source.clone(),
                },
            });
        }

        registry
    }

    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub fn job_infos(&self) -> Vec<JobInfo> {
        self.jobs.iter().map(JobSpec::info).collect()
    }
}
