use std::sync::Arc;

use axum::Router;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use crate::api_models::scheduler::JobInfo;
use crate::repositories::{JobHistoryStore, RankingStore};
use crate::routes;
use crate::utils::middleware;
use crate::utils::visit_recorder::{track_visit, VisitRecorder};

#[derive(Clone)]
pub struct AppState {
    pub ranking_store: Arc<dyn RankingStore>,
    pub job_history: Arc<dyn JobHistoryStore>,
    pub jobs: Arc<Vec<JobInfo>>,
}

pub fn build_app(state: AppState, visits: VisitRecorder) -> Router {
    routes::build_routes()
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(visits, track_visit))
        .layer(middleware::cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
