use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::tickers;

/// Markers the market-data provider uses for indices and unit classes.
/// Symbols carrying them cannot be resolved to a quote.
pub const NON_TRADABLE_MARKERS: [char; 2] = ['^', '/'];

pub fn is_tradable_symbol(symbol: &str) -> bool {
    !symbol.contains(&NON_TRADABLE_MARKERS[..])
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = tickers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ticker {
    pub id: i32,
    pub symbol: String,
    pub company_name: String,
    pub exchange: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticker {
    pub fn is_tradable(&self) -> bool {
        is_tradable_symbol(&self.symbol)
    }
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = tickers)]
pub struct NewTicker {
    pub symbol: String,
    pub company_name: String,
    pub exchange: String,
}
