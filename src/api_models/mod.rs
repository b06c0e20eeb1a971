pub mod performance;
pub mod scheduler;
