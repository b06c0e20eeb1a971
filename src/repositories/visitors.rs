use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::models::NewVisitor;
use crate::schema::visitors::dsl::*;

pub fn create(conn: &mut PgConnection, visit: &NewVisitor) -> Result<usize, diesel::result::Error> {
    diesel::insert_into(visitors).values(visit).execute(conn)
}
