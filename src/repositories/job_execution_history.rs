use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::result::Error as DieselError;

use crate::models::job_execution_history::{
    JobExecutionHistory, NewJobExecutionHistory, UpdateJobExecutionHistory,
};
use crate::schema::job_execution_history;

/// 分页查询条件
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub job_name: Option<String>,
    pub status: Option<String>,
    pub page: i64,
    pub page_size: i64,
}

/// 创建任务执行历史记录
pub fn create(
    conn: &mut PgConnection,
    new_history: &NewJobExecutionHistory,
) -> Result<JobExecutionHistory, DieselError> {
    diesel::insert_into(job_execution_history::table)
        .values(new_history)
        .returning(JobExecutionHistory::as_returning())
        .get_result(conn)
}

/// 更新任务执行历史
pub fn update(
    conn: &mut PgConnection,
    history_id: i32,
    update_data: &UpdateJobExecutionHistory,
) -> Result<JobExecutionHistory, DieselError> {
    diesel::update(job_execution_history::table.find(history_id))
        .set(update_data)
        .returning(JobExecutionHistory::as_returning())
        .get_result(conn)
}

fn filtered(filter: &HistoryFilter) -> job_execution_history::BoxedQuery<'_, Pg> {
    let mut query = job_execution_history::table.into_boxed();
    if let Some(name) = filter.job_name.as_deref() {
        query = query.filter(job_execution_history::job_name.eq(name));
    }
    if let Some(status) = filter.status.as_deref() {
        query = query.filter(job_execution_history::status.eq(status));
    }
    query
}

/// 分页查询执行历史
pub fn paginate(
    conn: &mut PgConnection,
    filter: &HistoryFilter,
) -> Result<(Vec<JobExecutionHistory>, i64), DieselError> {
    let offset = (filter.page - 1) * filter.page_size;

    let total = filtered(filter).count().get_result(conn)?;

    let items = filtered(filter)
        .order(job_execution_history::started_at.desc())
        .limit(filter.page_size)
        .offset(offset)
        .load::<JobExecutionHistory>(conn)?;

    Ok((items, total))
}
