//! 收益排行：提及记录 -> 拆股调整 -> 涨跌幅 -> 排序截断
//!
//! 固定顺序：排除用户 -> 时间窗口 -> 去重 -> 过滤无效价格 -> 计算 -> 排序 -> 截断

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{DateTime, Duration, Utc};

use crate::api_models::performance::{MentionPerformance, UserPerformance};
use crate::repositories::PickRow;
use crate::utils::bigdecimal_parser::{format_decimal, parse_decimal, parse_positive};
use crate::utils::percent::{format_percent, percent_change, round2, ZERO_PERCENT};

/// Bot and placeholder accounts kept out of every ranking.
pub const EXCLUDED_USERNAMES: [&str; 3] = ["AutoModerator", "VisualMod", "[deleted]"];

pub const TOP_N: usize = 10;

const PRICE_SCALE: i64 = 4;
const SPLIT_SCALE: i64 = 8;

pub fn is_excluded(username: &str) -> bool {
    EXCLUDED_USERNAMES.contains(&username)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

impl Period {
    /// Unknown or missing values mean all-time.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("daily") => Period::Daily,
            Some("weekly") => Period::Weekly,
            Some("monthly") => Period::Monthly,
            _ => Period::AllTime,
        }
    }

    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Daily => now - Duration::hours(24),
            Period::Weekly => now - Duration::days(7),
            Period::Monthly => now - Duration::days(30),
            Period::AllTime => DateTime::<Utc>::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Top,
    Worst,
}

struct ScoredPick {
    row: PickRow,
    adjusted: BigDecimal,
    split: BigDecimal,
    percent: BigDecimal,
}

fn display_price(raw: &str) -> String {
    parse_decimal(raw)
        .map(|price| format_decimal(&price, PRICE_SCALE, 2))
        .unwrap_or_else(|| raw.to_string())
}

/// None when the row cannot be ranked.
fn score(row: PickRow) -> Option<ScoredPick> {
    let raw = parse_positive(&row.mention_price)?;
    let split = parse_positive(&row.split_ratio)?;
    let current = row.current_price.as_deref().and_then(parse_decimal)?;
    let adjusted = &raw * &split;
    let percent = percent_change(&adjusted, &current)?;
    Some(ScoredPick {
        row,
        adjusted,
        split,
        percent,
    })
}

impl ScoredPick {
    fn into_view(self) -> MentionPerformance {
        MentionPerformance {
            symbol: self.row.symbol,
            mention_price: format_decimal(&self.adjusted, PRICE_SCALE, 2),
            current_price: self.row.current_price.as_deref().map(display_price),
            current_price_date: self.row.current_price_date,
            percent_change: format_percent(&self.percent),
            split_ratio: format_decimal(&self.split, SPLIT_SCALE, 1),
            mentioned_at: self.row.mentioned_at,
        }
    }
}

/// Same view as a scored pick, but every bad field degrades instead of dropping the row.
fn degraded_view(row: PickRow) -> MentionPerformance {
    let split = parse_positive(&row.split_ratio);
    let adjusted = parse_positive(&row.mention_price)
        .zip(split.as_ref())
        .map(|(raw, split)| &raw * split);
    let current = row.current_price.as_deref().and_then(parse_decimal);

    let percent = adjusted
        .as_ref()
        .zip(current.as_ref())
        .and_then(|(base, current)| percent_change(base, current))
        .map(|p| format_percent(&p))
        .unwrap_or_else(|| ZERO_PERCENT.to_string());

    MentionPerformance {
        mention_price: adjusted
            .map(|price| format_decimal(&price, PRICE_SCALE, 2))
            .unwrap_or_else(|| display_price(&row.mention_price)),
        current_price: row.current_price.as_deref().map(display_price),
        current_price_date: row.current_price_date,
        percent_change: percent,
        split_ratio: split
            .map(|s| format_decimal(&s, SPLIT_SCALE, 1))
            .unwrap_or(row.split_ratio),
        symbol: row.symbol,
        mentioned_at: row.mentioned_at,
    }
}

/// Earlier mention wins; equal timestamps go to the smaller username.
fn precedes(a: &PickRow, b: &PickRow) -> bool {
    (a.mentioned_at, &a.username) < (b.mentioned_at, &b.username)
}

fn earliest_by<K, F>(rows: Vec<PickRow>, key: F) -> Vec<PickRow>
where
    K: Eq + Hash,
    F: Fn(&PickRow) -> K,
{
    let mut earliest: HashMap<K, PickRow> = HashMap::new();
    for row in rows {
        match earliest.entry(key(&row)) {
            Entry::Occupied(mut slot) => {
                if precedes(&row, slot.get()) {
                    slot.insert(row);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }
    earliest.into_values().collect()
}

fn eligible(rows: Vec<PickRow>, cutoff: DateTime<Utc>) -> Vec<PickRow> {
    rows.into_iter()
        .filter(|row| !is_excluded(&row.username))
        .filter(|row| row.mentioned_at >= cutoff)
        .collect()
}

fn best_first(a: &ScoredPick, b: &ScoredPick) -> std::cmp::Ordering {
    b.percent
        .cmp(&a.percent)
        .then_with(|| a.row.mentioned_at.cmp(&b.row.mentioned_at))
        .then_with(|| a.row.symbol.cmp(&b.row.symbol))
}

/// 用户每只股票最早一次提及，按提及时间倒序
pub fn user_mentions(username: &str, rows: Vec<PickRow>) -> Vec<MentionPerformance> {
    if is_excluded(username) {
        return Vec::new();
    }

    let own: Vec<PickRow> = rows.into_iter().filter(|row| row.username == username).collect();
    let mut picks = earliest_by(own, |row| row.symbol.clone());
    picks.sort_by(|a, b| {
        b.mentioned_at
            .cmp(&a.mentioned_at)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    picks.into_iter().map(degraded_view).collect()
}

/// 全局每只股票只取最早一次提及，按涨跌幅排序取前 10
pub fn performing_picks(rows: Vec<PickRow>, direction: Direction, cutoff: DateTime<Utc>) -> Vec<MentionPerformance> {
    let earliest = earliest_by(eligible(rows, cutoff), |row| row.symbol.clone());

    let mut scored: Vec<ScoredPick> = earliest.into_iter().filter_map(score).collect();
    scored.sort_by(|a, b| match direction {
        Direction::Top => best_first(a, b),
        Direction::Worst => a
            .percent
            .cmp(&b.percent)
            .then_with(|| a.row.mentioned_at.cmp(&b.row.mentioned_at))
            .then_with(|| a.row.symbol.cmp(&b.row.symbol)),
    });
    scored.truncate(TOP_N);

    scored.into_iter().map(ScoredPick::into_view).collect()
}

/// 用户维度：每个 (用户, 股票) 取最早提及，非零涨跌幅求和
pub fn performing_users(rows: Vec<PickRow>, cutoff: DateTime<Utc>) -> Vec<UserPerformance> {
    let earliest = earliest_by(eligible(rows, cutoff), |row| {
        (row.username.clone(), row.symbol.clone())
    });

    let mut by_user: HashMap<String, Vec<ScoredPick>> = HashMap::new();
    for pick in earliest.into_iter().filter_map(score) {
        // exact zero means no observable movement
        if pick.percent.is_zero() {
            continue;
        }
        by_user.entry(pick.row.username.clone()).or_default().push(pick);
    }

    let mut users: Vec<(String, BigDecimal, Vec<ScoredPick>)> = by_user
        .into_iter()
        .map(|(username, mut picks)| {
            let total = picks
                .iter()
                .fold(BigDecimal::zero(), |acc, pick| acc + &pick.percent);
            picks.sort_by(best_first);
            (username, total, picks)
        })
        .collect();

    users.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    users.truncate(TOP_N);

    users
        .into_iter()
        .map(|(username, total, picks)| UserPerformance {
            username,
            total_percent_gain: round2(&total).to_f64().unwrap_or(0.0),
            picks: picks.into_iter().map(ScoredPick::into_view).collect(),
        })
        .collect()
}
