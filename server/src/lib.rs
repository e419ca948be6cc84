//! Currencies Service
//!
//! HTTP front end for the FX engine: `/rates` serves pairwise cross rates
//! for fiat currencies and `/exchange` converts between crypto assets.

pub mod api;
pub mod config;
pub mod metrics;

pub use api::{router, ApiError, AppState};
pub use config::{ConfigError, ErrorStatusPolicy, ServerConfig};
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
