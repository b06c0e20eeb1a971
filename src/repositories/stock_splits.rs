use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::models::NewStockSplit;
use crate::schema::stock_splits::dsl::*;

/// 同一拆股事件重复抓取时不再写入，返回是否为新记录
pub fn create_if_absent(conn: &mut PgConnection, split: &NewStockSplit) -> Result<bool, diesel::result::Error> {
    let inserted = diesel::insert_into(stock_splits)
        .values(split)
        .on_conflict((ticker_id, effective_date))
        .do_nothing()
        .execute(conn)?;
    Ok(inserted > 0)
}
