pub mod tickers;
pub mod ticker_prices;
pub mod stock_splits;
pub mod mentions;
pub mod visitors;
pub mod job_execution_history;

pub use tickers::{is_tradable_symbol, NewTicker, Ticker};
pub use ticker_prices::NewTickerPrice;
pub use stock_splits::NewStockSplit;
pub use mentions::NewMention;
pub use visitors::NewVisitor;
pub use job_execution_history::{JobExecutionHistory, NewJobExecutionHistory, UpdateJobExecutionHistory};
