//! Configuration module for linkarbor
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use linkarbor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("linkarbor.toml")).unwrap();
//! println!("Scrape concurrency: {}", config.crawler.max_concurrent_scrapes);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, Config, CrawlerConfig, PlatformEntry, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
