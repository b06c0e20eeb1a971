use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_SOURCES: [&str; 4] = ["wallstreetbets", "pennystocks", "investing", "stocks"];

pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));
        Self { addr }
    }
}

/// 抓取与行情任务的节奏参数
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub sources: Vec<String>,
    pub lookback: chrono::Duration,
    pub page_delay: Duration,
    pub post_delay: Duration,
    pub ticker_delay: Duration,
    pub visit_queue_capacity: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            lookback: chrono::Duration::hours(24),
            page_delay: Duration::from_millis(2000),
            post_delay: Duration::from_millis(2000),
            ticker_delay: Duration::from_millis(250),
            visit_queue_capacity: 1024,
        }
    }
}

impl CrawlConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let sources = std::env::var("FEED_SOURCES")
            .ok()
            .map(|raw| parse_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.sources);

        Self {
            sources,
            lookback: env_u64("FEED_LOOKBACK_HOURS")
                .and_then(lookback_hours)
                .unwrap_or(defaults.lookback),
            page_delay: env_u64("FEED_PAGE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.page_delay),
            post_delay: env_u64("FEED_POST_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.post_delay),
            ticker_delay: env_u64("TICKER_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ticker_delay),
            visit_queue_capacity: env_u64("VISIT_QUEUE_CAPACITY")
                .map(|c| c as usize)
                .filter(|c| *c > 0)
                .unwrap_or(defaults.visit_queue_capacity),
        }
    }
}

/// None when the hour count does not fit a chrono duration.
fn lookback_hours(hours: u64) -> Option<chrono::Duration> {
    i64::try_from(hours).ok().and_then(chrono::Duration::try_hours)
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
