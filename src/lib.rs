// Library for the binary and tests

pub mod config;
pub mod metrics_repo;
pub mod models;
pub mod store;
