use axum::{
    extract::{Query, State},
    Json,
};

use crate::api_models::scheduler::{
    HistoryQueryParams, JobExecutionHistoryItem, JobExecutionHistoryResponse, JobInfo,
};
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::repositories::HistoryFilter;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// 已注册的定时任务
pub async fn get_job_list(State(state): State<AppState>) -> Json<Vec<JobInfo>> {
    Json(state.jobs.as_ref().clone())
}

/// 分页查询任务执行历史
pub async fn get_execution_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQueryParams>,
) -> Result<Json<JobExecutionHistoryResponse>, AppError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::BadRequest("page must be >= 1".to_string()));
    }
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::BadRequest(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let filter = HistoryFilter {
        job_name: params.job_name.filter(|s| !s.is_empty()),
        status: params.status.filter(|s| !s.is_empty()),
        page,
        page_size,
    };
    let (items, total) = state.job_history.list_runs(filter).await?;

    Ok(Json(JobExecutionHistoryResponse {
        total,
        page,
        page_size,
        items: items.into_iter().map(JobExecutionHistoryItem::from).collect(),
    }))
}
