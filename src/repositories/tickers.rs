use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::models::{NewTicker, Ticker};
use crate::schema::tickers::dsl::*;

pub fn list_all(conn: &mut PgConnection) -> Result<Vec<Ticker>, diesel::result::Error> {
    tickers.order(symbol.asc()).select(Ticker::as_select()).load(conn)
}

pub fn find_by_symbol(conn: &mut PgConnection, wanted: &str) -> Result<Option<Ticker>, diesel::result::Error> {
    tickers
        .filter(symbol.eq(wanted))
        .select(Ticker::as_select())
        .first(conn)
        .optional()
}

/// 按 symbol 插入或更新公司名与交易所
pub fn upsert(conn: &mut PgConnection, new_ticker: &NewTicker) -> Result<Ticker, diesel::result::Error> {
    diesel::insert_into(tickers)
        .values(new_ticker)
        .on_conflict(symbol)
        .do_update()
        .set((
            company_name.eq(excluded(company_name)),
            exchange.eq(excluded(exchange)),
            updated_at.eq(Utc::now()),
        ))
        .returning(Ticker::as_returning())
        .get_result(conn)
}
