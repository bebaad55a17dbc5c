//! Linkarbor: a site-map tree builder
//!
//! This crate crawls a target URL together with its kin (ancestor paths,
//! the site root, and descendant paths), classifies every outgoing link,
//! and assembles the results into a hierarchical links tree. Trees and
//! flat responses are cached in a key-value store and reused on repeat
//! requests.

pub mod cache;
pub mod config;
pub mod extract;
pub mod links;
pub mod robots;
pub mod scrape;
pub mod tree;
pub mod url;

use thiserror::Error;

/// Main error type for linkarbor operations
#[derive(Debug, Error)]
pub enum LinkArborError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Failed to scrape {url}: {message}")]
    ScrapeFailed { url: String, message: String },

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid platform origin in config: {0}")]
    InvalidPlatformOrigin(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for linkarbor operations
pub type Result<T> = std::result::Result<T, LinkArborError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use links::{LinksOptions, LinksResponse, Orchestrator};
pub use tree::{Tree, TreeNode};
pub use url::{ancestor_paths, classify_link, derive_root_url, normalize_url, LinkBucket};
