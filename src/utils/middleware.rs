use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// 未配置 ALLOWED_ORIGINS 时放行所有来源（浏览器扩展会直接调用接口）
pub fn cors_layer() -> CorsLayer {
    let allowed_env = std::env::var("ALLOWED_ORIGINS").unwrap_or_default();
    let from_env: Vec<HeaderValue> = allowed_env
        .split(',')
        .filter_map(|o| {
            let trimmed = o.trim();
            if trimmed.is_empty() {
                None
            } else {
                HeaderValue::from_str(trimmed).ok()
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    if from_env.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(from_env)
    }
}
