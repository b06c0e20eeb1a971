use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use crate::models::{NewJobExecutionHistory, UpdateJobExecutionHistory};
use crate::repositories::JobHistoryStore;

/// Only this many per-ticker failures are logged individually per run.
pub const LOGGED_ERROR_LIMIT: usize = 10;
pub const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

/// 单次任务执行结果统计
#[derive(Debug, Default)]
pub struct JobReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub details: Option<Value>,
}

impl JobReport {
    pub fn status(&self) -> RunStatus {
        if self.failed == 0 {
            RunStatus::Success
        } else if self.success > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        }
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

async fn start_history(history: &dyn JobHistoryStore, job_name: &str) -> Option<i32> {
    let run = NewJobExecutionHistory {
        job_name: job_name.to_string(),
        status: RunStatus::Running.as_str().to_string(),
        started_at: Utc::now(),
        completed_at: None,
        total_count: 0,
        success_count: 0,
        failed_count: 0,
        skipped_count: 0,
        details: None,
        error_message: None,
        duration_ms: None,
    };
    match history.start_run(run).await {
        Ok(id) => {
            tracing::debug!("创建任务执行记录，ID: {}", id);
            Some(id)
        }
        Err(e) => {
            tracing::warn!("创建任务执行记录失败 [{}]: {}", job_name, e);
            None
        }
    }
}

/// 在独立任务中执行，超时或 panic 都记为 failed，不会影响其他任务
pub async fn run_guarded<F>(
    job_name: &str,
    deadline: Duration,
    history: Arc<dyn JobHistoryStore>,
    task: F,
) -> RunStatus
where
    F: Future<Output = anyhow::Result<JobReport>> + Send + 'static,
{
    tracing::info!("任务 {} 开始执行", job_name);
    let started = Utc::now();
    let history_id = start_history(&*history, job_name).await;

    let handle = tokio::spawn(async move { tokio::time::timeout(deadline, task).await });

    let (report, error_message) = match handle.await {
        Ok(Ok(Ok(report))) => (report, None),
        Ok(Ok(Err(e))) => (JobReport::default(), Some(format!("{:#}", e))),
        Ok(Err(_)) => (
            JobReport::default(),
            Some(format!("deadline of {}s exceeded", deadline.as_secs())),
        ),
        Err(e) if e.is_panic() => (JobReport::default(), Some("job panicked".to_string())),
        Err(e) => (JobReport::default(), Some(format!("job aborted: {}", e))),
    };

    let status = match &error_message {
        Some(message) => {
            tracing::error!("任务 {} 执行失败: {}", job_name, message);
            RunStatus::Failed
        }
        None => report.status(),
    };

    let finished = Utc::now();
    let duration_ms = (finished - started).num_milliseconds();
    tracing::info!(
        "任务 {} 结束，状态: {}，总计: {}，成功: {}，失败: {}，跳过: {}，耗时 {}ms",
        job_name,
        status.as_str(),
        report.total,
        report.success,
        report.failed,
        report.skipped,
        duration_ms
    );

    if let Some(id) = history_id {
        let update = UpdateJobExecutionHistory {
            status: Some(status.as_str().to_string()),
            completed_at: Some(finished),
            total_count: Some(count(report.total)),
            success_count: Some(count(report.success)),
            failed_count: Some(count(report.failed)),
            skipped_count: Some(count(report.skipped)),
            details: report.details,
            error_message,
            duration_ms: Some(duration_ms),
        };
        if let Err(e) = history.finish_run(id, update).await {
            tracing::warn!("更新任务执行记录失败 [{}]: {}", job_name, e);
        }
    }

    status
}
