use axum::{routing::get, Router};

use crate::app::AppState;
use crate::handler::performance::{
    get_excluded_usernames, get_top_performers, get_top_picks, get_user_mentions, get_worst_picks,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mentions/:username", get(get_user_mentions))
        .route("/excluded-usernames", get(get_excluded_usernames))
        // 排行接口，period = daily / weekly / monthly，其余视为全部时间
        .route("/top-performers", get(get_top_performers))
        .route("/top-picks", get(get_top_picks))
        .route("/worst-picks", get(get_worst_picks))
}
