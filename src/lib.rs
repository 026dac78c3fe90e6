// SDG Analytics - experiment management for SDG course-outline classification
// Library exports

pub mod config;
pub mod errors;
pub mod evaluation;
pub mod models;
pub mod orchestrator;
pub mod storage;
pub mod taxonomy;

pub use errors::{AnalyticsError, Result};
