use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::models::NewTickerPrice;
use crate::schema::ticker_prices::dsl::*;

pub fn create(conn: &mut PgConnection, new_price: &NewTickerPrice) -> Result<usize, diesel::result::Error> {
    diesel::insert_into(ticker_prices).values(new_price).execute(conn)
}
