pub mod constants;
pub mod engine;
pub mod server_protocol;
pub mod server_utils;
pub mod standings_store;
pub mod types;
