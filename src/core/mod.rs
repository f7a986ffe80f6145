pub mod config;
pub mod constants;
pub mod dispatch;
pub mod message;
pub mod store;
