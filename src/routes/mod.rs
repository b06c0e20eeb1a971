use axum::Router;

use crate::app::AppState;

mod health;
mod performance;
mod root;
mod scheduler;

pub fn build_routes() -> Router<AppState> {
    Router::new()
        // 根路径
        .merge(root::router())
        // 业务 API 统一挂在 /api 前缀下
        .nest(
            "/api",
            health::router()
                .merge(performance::router())
                .merge(scheduler::router()),
        )
}
