use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::ticker_prices;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = ticker_prices)]
pub struct NewTickerPrice {
    pub ticker_id: i32,
    pub price: BigDecimal,
    pub volume: i64,
    pub recorded_at: DateTime<Utc>,
}
