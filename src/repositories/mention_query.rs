use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Array, Nullable, Text, Timestamptz};

/// 提及记录 + 最新价格 + 累计拆股系数
///
/// 价格以文本返回，数值解析交给排行计算，坏数据只影响单行
#[derive(Debug, Clone, QueryableByName)]
pub struct PickRow {
    #[diesel(sql_type = Text)]
    pub username: String,
    #[diesel(sql_type = Text)]
    pub symbol: String,
    #[diesel(sql_type = Text)]
    pub mention_price: String,
    #[diesel(sql_type = Timestamptz)]
    pub mentioned_at: DateTime<Utc>,
    #[diesel(sql_type = Nullable<Text>)]
    pub current_price: Option<String>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub current_price_date: Option<DateTime<Utc>>,
    #[diesel(sql_type = Text)]
    pub split_ratio: String,
}

// split_ratio: product of every split effective after the mention and up to now.
const PICK_COLUMNS: &str = r#"
    m.username,
    t.symbol,
    m.price::text AS mention_price,
    m.mentioned_at,
    lp.price::text AS current_price,
    lp.recorded_at AS current_price_date,
    COALESCE(
        (SELECT ROUND(EXP(SUM(LN(s.ratio))), 8)
           FROM stock_splits s
          WHERE s.ticker_id = m.ticker_id
            AND s.ratio > 0
            AND s.effective_date > m.mentioned_at
            AND s.effective_date <= NOW()),
        1
    )::text AS split_ratio
"#;

const PICK_JOINS: &str = r#"
    FROM mentions m
    JOIN tickers t ON t.id = m.ticker_id
    LEFT JOIN LATERAL (
        SELECT tp.price, tp.recorded_at
          FROM ticker_prices tp
         WHERE tp.ticker_id = m.ticker_id
         ORDER BY tp.recorded_at DESC
         LIMIT 1
    ) lp ON TRUE
"#;

/// 用户对每只股票最早的一次提及
pub fn user_earliest_mentions(
    conn: &mut PgConnection,
    username: &str,
) -> Result<Vec<PickRow>, diesel::result::Error> {
    let query = format!(
        "SELECT DISTINCT ON (t.symbol) {PICK_COLUMNS} {PICK_JOINS} \
         WHERE m.username = $1 \
         ORDER BY t.symbol, m.mentioned_at ASC"
    );
    diesel::sql_query(query)
        .bind::<Text, _>(username)
        .load(conn)
}

const SINCE_FILTER: &str = "WHERE m.mentioned_at >= $1 AND m.username <> ALL($2)";

fn earliest_picks_sql() -> String {
    format!(
        "SELECT DISTINCT ON (t.symbol) {PICK_COLUMNS} {PICK_JOINS} {SINCE_FILTER} \
         ORDER BY t.symbol, m.mentioned_at ASC, m.username ASC"
    )
}

fn user_picks_sql() -> String {
    format!(
        "SELECT DISTINCT ON (m.username, t.symbol) {PICK_COLUMNS} {PICK_JOINS} {SINCE_FILTER} \
         ORDER BY m.username, t.symbol, m.mentioned_at ASC"
    )
}

fn load_since(
    conn: &mut PgConnection,
    query: String,
    cutoff: DateTime<Utc>,
    excluded: &[&str],
) -> Result<Vec<PickRow>, diesel::result::Error> {
    let excluded: Vec<String> = excluded.iter().map(|name| name.to_string()).collect();
    diesel::sql_query(query)
        .bind::<Timestamptz, _>(cutoff)
        .bind::<Array<Text>, _>(excluded)
        .load(conn)
}

/// cutoff 之后每只股票最早的一次提及（先排除用户，再去重）
pub fn earliest_picks_since(
    conn: &mut PgConnection,
    cutoff: DateTime<Utc>,
    excluded: &[&str],
) -> Result<Vec<PickRow>, diesel::result::Error> {
    load_since(conn, earliest_picks_sql(), cutoff, excluded)
}

/// cutoff 之后每个 (用户, 股票) 最早的一次提及
pub fn user_picks_since(
    conn: &mut PgConnection,
    cutoff: DateTime<Utc>,
    excluded: &[&str],
) -> Result<Vec<PickRow>, diesel::result::Error> {
    load_since(conn, user_picks_sql(), cutoff, excluded)
}
