use serde::Deserialize;

/// Main configuration structure for linkarbor
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_platforms")]
    pub platform: Vec<PlatformEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent page scrapes per request
    #[serde(rename = "max-concurrent-scrapes", default = "default_concurrency")]
    pub max_concurrent_scrapes: usize,

    /// Maximum number of kin (ancestors or descendants) scraped per phase
    #[serde(rename = "kin-limit", default = "default_kin_limit")]
    pub kin_limit: usize,

    /// Hard timeout for a single fetch, independent of caller cancellation
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default = "default_contact_email")]
    pub contact_email: String,
}

/// Cache backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Path to the SQLite cache database; empty string selects the
    /// in-memory backend
    #[serde(rename = "database-path", default)]
    pub database_path: String,

    /// Default TTL applied when a request does not set its own
    #[serde(rename = "default-ttl-secs", default = "default_ttl")]
    pub default_ttl_secs: u64,
}

/// A platform origin entry
///
/// Platform origins are multi-tenant hosts (code forges, social networks)
/// where the crawl scope is narrowed to the target's own subtree rather
/// than the whole site.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformEntry {
    /// Origin in `scheme://host` form, matched case-insensitively
    pub origin: String,
}

fn default_concurrency() -> usize {
    5
}

fn default_kin_limit() -> usize {
    25
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_crawler_name() -> String {
    "Linkarbor".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://github.com/linkarbor/linkarbor".to_string()
}

fn default_contact_email() -> String {
    "crawler@linkarbor.dev".to_string()
}

fn default_ttl() -> u64 {
    86400
}

fn default_platforms() -> Vec<PlatformEntry> {
    [
        "https://github.com",
        "https://gitlab.com",
        "https://bitbucket.org",
        "https://linkedin.com",
        "https://medium.com",
        "https://x.com",
    ]
    .iter()
    .map(|origin| PlatformEntry {
        origin: (*origin).to_string(),
    })
    .collect()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scrapes: default_concurrency(),
            kin_limit: default_kin_limit(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            contact_email: default_contact_email(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            default_ttl_secs: default_ttl(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig::default(),
            cache: CacheConfig::default(),
            platform: default_platforms(),
        }
    }
}
