use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::api_models::performance::{MentionPerformance, PeriodQuery, UserPerformance};
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::services::ranking::{self, Direction, Period, EXCLUDED_USERNAMES};

/// 用户提及过的股票及其表现
pub async fn get_user_mentions(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<MentionPerformance>>, AppError> {
    if ranking::is_excluded(&username) {
        return Ok(Json(Vec::new()));
    }

    let rows = state.ranking_store.user_mentions(&username).await?;
    Ok(Json(ranking::user_mentions(&username, rows)))
}

pub async fn get_excluded_usernames() -> Json<Vec<&'static str>> {
    Json(EXCLUDED_USERNAMES.to_vec())
}

/// 收益最高的用户
pub async fn get_top_performers(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<UserPerformance>>, AppError> {
    let cutoff = Period::parse(query.period.as_deref()).cutoff(Utc::now());
    let rows = state
        .ranking_store
        .user_picks_since(cutoff, &EXCLUDED_USERNAMES)
        .await?;
    Ok(Json(ranking::performing_users(rows, cutoff)))
}

async fn ranked_picks(
    state: AppState,
    query: PeriodQuery,
    direction: Direction,
) -> Result<Json<Vec<MentionPerformance>>, AppError> {
    let cutoff = Period::parse(query.period.as_deref()).cutoff(Utc::now());
    let rows = state
        .ranking_store
        .earliest_picks_since(cutoff, &EXCLUDED_USERNAMES)
        .await?;
    Ok(Json(ranking::performing_picks(rows, direction, cutoff)))
}

pub async fn get_top_picks(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<MentionPerformance>>, AppError> {
    ranked_picks(state, query, Direction::Top).await
}

pub async fn get_worst_picks(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<MentionPerformance>>, AppError> {
    ranked_picks(state, query, Direction::Worst).await
}
