pub mod config;
pub mod error;
pub mod evaluator;
pub mod latency;
pub mod metrics;
pub mod report;
pub mod soh;
pub mod station;
pub mod upload;
