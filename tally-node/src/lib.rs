pub mod actor;
pub mod config;
pub mod contract;
pub mod store;
