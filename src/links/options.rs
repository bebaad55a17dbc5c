use crate::extract::{CleaningProcessor, LinkExtractionOptions};
use crate::scrape::FetchOptions;
use crate::tree::LinksOrder;
use crate::url::normalize_url;
use crate::{LinkArborError, Result};
use serde::{Deserialize, Serialize};

/// Lower bound for per-request cache TTLs (seconds)
const MIN_TTL_SECS: u64 = 60;

/// Upper bound for per-request cache TTLs (seconds)
const MAX_TTL_SECS: u64 = 31_536_000;

/// Options for one links request
///
/// Field names follow the wire format of the service; everything except
/// `url` has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksOptions {
    /// Target URL
    pub url: String,

    /// Enable tree assembly
    #[serde(default = "default_true")]
    pub tree: bool,

    /// Include extracted links on each tree node or at the response root
    #[serde(default)]
    pub extracted_links: bool,

    /// Attach metadata on each node
    #[serde(default)]
    pub metadata: bool,

    /// Attach cleaned HTML on each node
    #[serde(default, rename = "cleanedHTML")]
    pub cleaned_html: bool,

    /// Fetch robots.txt for the root (data capture only)
    #[serde(default)]
    pub robots: bool,

    /// Fetch sitemap.xml for the root (data capture only)
    #[serde(default, rename = "sitemapXML")]
    pub sitemap_xml: bool,

    /// Treat the subdomain host as the crawl root
    #[serde(default, rename = "subdomainAsRootURL")]
    pub subdomain_as_root_url: bool,

    /// Force platform-mode classification
    #[serde(default, rename = "isPlatformURL")]
    pub is_platform_url: bool,

    /// Order folders before leaves
    #[serde(default)]
    pub folder_first: bool,

    /// Sibling ordering policy
    #[serde(default)]
    pub links_order: LinksOrder,

    /// Which cleaning pass to run
    #[serde(default)]
    pub cleaning_processor: CleaningProcessor,

    #[serde(default)]
    pub cache_options: CacheOptions,

    #[serde(default)]
    pub metrics_options: MetricsOptions,

    #[serde(default)]
    pub link_extraction_options: LinkExtractionOptions,

    #[serde(default)]
    pub fetch_options: FetchOptions,
}

/// Per-request cache controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// KV TTL in seconds
    #[serde(default = "default_ttl", rename = "expirationTTL")]
    pub expiration_ttl: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            expiration_ttl: default_ttl(),
        }
    }
}

/// Per-request metrics controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsOptions {
    #[serde(default)]
    pub enable: bool,
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u64 {
    86400
}

impl LinksOptions {
    /// Creates options for a target URL with every default
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            tree: true,
            extracted_links: false,
            metadata: false,
            cleaned_html: false,
            robots: false,
            sitemap_xml: false,
            subdomain_as_root_url: false,
            is_platform_url: false,
            folder_first: false,
            links_order: LinksOrder::default(),
            cleaning_processor: CleaningProcessor::default(),
            cache_options: CacheOptions::default(),
            metrics_options: MetricsOptions::default(),
            link_extraction_options: LinkExtractionOptions::default(),
            fetch_options: FetchOptions::default(),
        }
    }

    /// Validates option bounds
    ///
    /// The URL itself is validated separately by normalization.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(LinkArborError::Internal(
                "url option cannot be empty".to_string(),
            ));
        }

        normalize_url(&self.url)?;

        let ttl = self.cache_options.expiration_ttl;
        if !(MIN_TTL_SECS..=MAX_TTL_SECS).contains(&ttl) {
            return Err(LinkArborError::Internal(format!(
                "expirationTTL must be between {} and {} seconds, got {}",
                MIN_TTL_SECS, MAX_TTL_SECS, ttl
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::FetchMethod;

    #[test]
    fn test_defaults() {
        let options = LinksOptions::new("https://example.com/");
        assert!(options.tree);
        assert!(!options.extracted_links);
        assert!(!options.metadata);
        assert!(options.cache_options.enabled);
        assert_eq!(options.cache_options.expiration_ttl, 86400);
        assert_eq!(options.links_order, LinksOrder::Page);
    }

    #[test]
    fn test_deserialize_minimal() {
        let options: LinksOptions =
            serde_json::from_str(r#"{"url": "https://example.com/a"}"#).unwrap();
        assert_eq!(options.url, "https://example.com/a");
        assert!(options.tree);
        assert_eq!(options.fetch_options.method, FetchMethod::Get);
    }

    #[test]
    fn test_deserialize_wire_names() {
        let options: LinksOptions = serde_json::from_str(
            r#"{
                "url": "https://example.com/a",
                "tree": false,
                "cleanedHTML": true,
                "sitemapXML": true,
                "subdomainAsRootURL": true,
                "isPlatformURL": true,
                "linksOrder": "alphabetical",
                "cleaningProcessor": "html-rewriter",
                "cacheOptions": {"enabled": false, "expirationTTL": 3600},
                "linkExtractionOptions": {"includeExternal": true, "includeMedia": true}
            }"#,
        )
        .unwrap();

        assert!(!options.tree);
        assert!(options.cleaned_html);
        assert!(options.sitemap_xml);
        assert!(options.subdomain_as_root_url);
        assert!(options.is_platform_url);
        assert_eq!(options.links_order, LinksOrder::Alphabetical);
        assert_eq!(options.cleaning_processor, CleaningProcessor::HtmlRewriter);
        assert!(!options.cache_options.enabled);
        assert_eq!(options.cache_options.expiration_ttl, 3600);
        assert!(options.link_extraction_options.include_external);
        assert!(options.link_extraction_options.include_media);
    }

    #[test]
    fn test_validate_ok() {
        assert!(LinksOptions::new("https://example.com/a").validate().is_ok());
    }

    #[test]
    fn test_validate_bad_url() {
        assert!(LinksOptions::new("not a url").validate().is_err());
        assert!(LinksOptions::new("").validate().is_err());
        assert!(LinksOptions::new("ftp://example.com/").validate().is_err());
    }

    #[test]
    fn test_validate_ttl_bounds() {
        let mut options = LinksOptions::new("https://example.com/");
        options.cache_options.expiration_ttl = 1;
        assert!(options.validate().is_err());

        options.cache_options.expiration_ttl = 60;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut options = LinksOptions::new("https://example.com/a");
        options.folder_first = true;
        options.links_order = LinksOrder::Alphabetical;

        let json = serde_json::to_string(&options).unwrap();
        let back: LinksOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(options, back);
    }
}
