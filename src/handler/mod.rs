pub mod error;
pub mod performance;
pub mod scheduler;
