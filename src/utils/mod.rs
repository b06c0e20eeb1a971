pub mod bigdecimal_parser;
pub mod config;
pub mod http_client;
pub mod logging;
pub mod middleware;
pub mod percent;
pub mod visit_recorder;
