use axum::{routing::get, Router};

use crate::app::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(root))
}

async fn root() -> &'static str {
    "Stock mentions backend"
}
