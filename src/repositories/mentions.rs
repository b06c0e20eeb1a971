use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::models::NewMention;
use crate::schema::mentions::dsl::*;

/// 同一帖子/评论对同一股票只记录一次
pub fn create_if_absent(conn: &mut PgConnection, mention: &NewMention) -> Result<bool, diesel::result::Error> {
    let inserted = diesel::insert_into(mentions)
        .values(mention)
        .on_conflict((source_kind, source_id, ticker_id))
        .do_nothing()
        .execute(conn)?;
    Ok(inserted > 0)
}
