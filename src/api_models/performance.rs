use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单条提及的收益表现
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MentionPerformance {
    pub symbol: String,
    /// Split-adjusted when the split factor parses, raw text otherwise.
    pub mention_price: String,
    pub current_price: Option<String>,
    pub current_price_date: Option<DateTime<Utc>>,
    pub percent_change: String,
    pub split_ratio: String,
    pub mentioned_at: DateTime<Utc>,
}

/// 用户维度汇总
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserPerformance {
    pub username: String,
    pub total_percent_gain: f64,
    pub picks: Vec<MentionPerformance>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PeriodQuery {
    pub period: Option<String>,
}
