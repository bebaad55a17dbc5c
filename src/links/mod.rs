//! Links engine module
//!
//! This module contains the public request surface:
//! - Request options and their validation
//! - The response union (success with/without tree, error)
//! - The orchestrator driving cache, kin scraping, and tree assembly

mod options;
mod orchestrator;
mod response;

pub use options::{CacheOptions, LinksOptions, MetricsOptions};
pub use orchestrator::Orchestrator;
pub use response::{LinksErrorResponse, LinksResponse, LinksSuccessResponse, RequestMetrics};
