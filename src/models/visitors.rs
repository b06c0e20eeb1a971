use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::visitors;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = visitors)]
pub struct NewVisitor {
    pub ip_address: String,
    pub endpoint: String,
    pub visited_at: DateTime<Utc>,
}
