pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod client;
pub mod monitor;
pub mod registry;
pub mod worker;
