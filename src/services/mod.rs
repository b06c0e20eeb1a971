pub mod feed_collector;
pub mod market_data;
pub mod mention_extractor;
pub mod ranking;
pub mod roster;
