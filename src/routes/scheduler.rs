use axum::{routing::get, Router};

use crate::app::AppState;
use crate::handler::scheduler::{get_execution_history, get_job_list};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(get_job_list))
        .route("/jobs/history", get(get_execution_history))
}
