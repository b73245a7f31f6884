pub mod client;
pub mod config;
pub mod errors;
pub mod freshness;
pub mod http;
pub mod metrics;
pub mod model;
pub mod suite;

pub use freshness::{FreshnessCheck, is_within_one_minute, parse_timestamp};
