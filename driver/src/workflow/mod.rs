pub mod batches;
pub mod config;
pub mod mirror;
pub mod output;
pub mod runner;
