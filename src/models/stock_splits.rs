use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::stock_splits;

/// `ratio` multiplies a pre-split price into post-split terms.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = stock_splits)]
pub struct NewStockSplit {
    pub ticker_id: i32,
    pub ratio: BigDecimal,
    pub effective_date: DateTime<Utc>,
}
