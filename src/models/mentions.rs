use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::mentions;

pub const SOURCE_POST: &str = "post";
pub const SOURCE_COMMENT: &str = "comment";

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = mentions)]
pub struct NewMention {
    pub ticker_id: i32,
    pub username: String,
    pub source_kind: String,
    pub source_id: String,
    pub price: BigDecimal,
    pub mentioned_at: DateTime<Utc>,
}
