//! Per-request scrape coordination
//!
//! A [`ScrapeCoordinator`] owns all mutable state for one links request:
//! the visited set, visit timestamps, the scraped-data cache, and the
//! skipped-URL map. It guarantees every URL is scraped at most once per
//! request and absorbs non-target failures into skip reasons.

use crate::extract::{clean_html, extract_metadata, CleaningProcessor, PageMetadata};
use crate::robots::ParsedRobots;
use crate::scrape::fetcher::{FetchOptions, FetchOutcome, Fetcher};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Per-scrape option set resolved from the request options
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Run the cleaner and attach cleaned HTML
    pub cleaned_html: bool,
    /// Which cleaning pass to run
    pub cleaning_processor: CleaningProcessor,
    /// Capture robots.txt for the root URL
    pub robots: bool,
    /// Capture sitemap.xml for the root URL
    pub sitemap_xml: bool,
    /// Transport options forwarded to the fetcher
    pub fetch: FetchOptions,
}

/// Root-level meta files captured as data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_txt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap_xml: Option<String>,
    /// Sitemap URLs declared inside robots.txt
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sitemaps: Vec<String>,
    /// Whether robots.txt would allow the target for this crawler.
    /// Informational only; the crawl never gates on it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_allows_target: Option<bool>,
}

impl MetaFiles {
    pub fn is_empty(&self) -> bool {
        self.robots_txt.is_none()
            && self.sitemap_xml.is_none()
            && self.sitemaps.is_empty()
            && self.robots_allows_target.is_none()
    }
}

/// Everything scraped from one page
#[derive(Debug, Clone)]
pub struct ScrapedData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub raw_html: String,
    pub final_url: String,
    pub cleaned_html: Option<String>,
    pub metadata: Option<PageMetadata>,
    pub meta_files: Option<MetaFiles>,
}

/// Per-request mutable state, guarded by a single mutex
///
/// Critical sections never hold the lock across an await point.
#[derive(Default)]
struct CoordinatorState {
    /// URLs claimed for scraping (prevents duplicate fetches)
    claimed: HashSet<String>,
    /// URLs successfully scraped
    visited: HashSet<String>,
    /// Visit timestamps, stamped at fetch success
    visited_at: HashMap<String, DateTime<Utc>>,
    /// Scraped data per URL
    data: HashMap<String, ScrapedData>,
    /// Skip reasons per URL
    skipped: HashMap<String, String>,
}

/// Coordinates all scraping for a single links request
pub struct ScrapeCoordinator {
    fetcher: Arc<dyn Fetcher>,
    root_url: Url,
    target_url: Url,
    user_agent_name: String,
    state: Mutex<CoordinatorState>,
}

impl ScrapeCoordinator {
    /// Creates a coordinator for one request
    ///
    /// # Arguments
    ///
    /// * `fetcher` - The fetch backend
    /// * `root_url` - The derived crawl root; meta-file capture only runs
    ///   for this URL
    /// * `target_url` - The request target, used for the informational
    ///   robots allow check
    /// * `user_agent_name` - Crawler name used in the robots check
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        root_url: Url,
        target_url: Url,
        user_agent_name: String,
    ) -> Self {
        Self {
            fetcher,
            root_url,
            target_url,
            user_agent_name,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Scrapes a URL unless this request already did
    ///
    /// Returns the memoized data on repeat calls. Fetch failures are
    /// recorded as skip reasons and yield `None`; they are never
    /// propagated as errors.
    pub async fn scrape_if_not_visited(
        &self,
        url: &Url,
        options: &ScrapeOptions,
        cancel: &CancellationToken,
    ) -> Option<ScrapedData> {
        let key = url.to_string();

        {
            let mut state = self.state.lock().expect("coordinator state poisoned");
            if !state.claimed.insert(key.clone()) {
                // Already claimed by this request: hand back whatever it got
                return state.data.get(&key).cloned();
            }
        }

        tracing::debug!("Scraping {}", key);
        let outcome = self.fetcher.fetch(url, &options.fetch, cancel).await;

        let page = match outcome {
            FetchOutcome::Success(page) => page,
            other => {
                let message = other
                    .failure_message()
                    .unwrap_or_else(|| "Unknown fetch failure".to_string());
                tracing::debug!("Scrape failed for {}: {}", key, message);
                self.record_skip(url, &format!("Failed to scrape: {}", message));
                return None;
            }
        };

        if page.body.is_empty() {
            self.record_skip(url, "Failed to scrape: empty response body");
            return None;
        }

        let base_url = Url::parse(&page.final_url).unwrap_or_else(|_| url.clone());
        let metadata = extract_metadata(&page.body, &base_url);

        let cleaned_html = if options.cleaned_html {
            Some(clean_html(&page.body, options.cleaning_processor))
        } else {
            None
        };

        // Meta files are captured only for the crawl root
        let meta_files = if *url == self.root_url && (options.robots || options.sitemap_xml) {
            let captured = self
                .capture_meta_files(options.robots, options.sitemap_xml, cancel)
                .await;
            if captured.is_empty() {
                None
            } else {
                Some(captured)
            }
        } else {
            None
        };

        let data = ScrapedData {
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            raw_html: page.body,
            final_url: page.final_url,
            cleaned_html,
            metadata: if metadata.is_empty() {
                None
            } else {
                Some(metadata)
            },
            meta_files,
        };

        let mut state = self.state.lock().expect("coordinator state poisoned");
        state.visited.insert(key.clone());
        state.visited_at.insert(key.clone(), Utc::now());
        state.data.insert(key, data.clone());

        Some(data)
    }

    /// Fetches robots.txt and sitemap.xml from the root origin as data
    async fn capture_meta_files(
        &self,
        robots: bool,
        sitemap_xml: bool,
        cancel: &CancellationToken,
    ) -> MetaFiles {
        let mut meta = MetaFiles::default();
        let fetch_options = FetchOptions::default();

        if robots {
            if let Ok(robots_url) = self.root_url.join("/robots.txt") {
                if let FetchOutcome::Success(page) =
                    self.fetcher.fetch(&robots_url, &fetch_options, cancel).await
                {
                    let parsed = ParsedRobots::from_content(&page.body);
                    meta.sitemaps = parsed.sitemaps();
                    meta.robots_allows_target =
                        Some(parsed.is_allowed(self.target_url.path(), &self.user_agent_name));
                    meta.robots_txt = Some(page.body);
                }
            }
        }

        if sitemap_xml {
            if let Ok(sitemap_url) = self.root_url.join("/sitemap.xml") {
                if let FetchOutcome::Success(page) =
                    self.fetcher.fetch(&sitemap_url, &fetch_options, cancel).await
                {
                    meta.sitemap_xml = Some(page.body);
                }
            }
        }

        meta
    }

    /// Records a skip reason for a URL
    pub fn record_skip(&self, url: &Url, reason: &str) {
        let mut state = self.state.lock().expect("coordinator state poisoned");
        state
            .skipped
            .entry(url.to_string())
            .or_insert_with(|| reason.to_string());
    }

    /// Records a skip reason keyed by raw href (for unparseable links)
    pub fn record_skip_raw(&self, href: &str, reason: &str) {
        let mut state = self.state.lock().expect("coordinator state poisoned");
        state
            .skipped
            .entry(href.to_string())
            .or_insert_with(|| reason.to_string());
    }

    /// Returns the scraped data for a URL, if any
    pub fn data_for(&self, url: &Url) -> Option<ScrapedData> {
        let state = self.state.lock().expect("coordinator state poisoned");
        state.data.get(url.as_str()).cloned()
    }

    /// Snapshot of the visited set
    pub fn visited_urls(&self) -> HashSet<String> {
        let state = self.state.lock().expect("coordinator state poisoned");
        state.visited.clone()
    }

    /// Snapshot of visit timestamps
    pub fn visited_timestamps(&self) -> HashMap<String, DateTime<Utc>> {
        let state = self.state.lock().expect("coordinator state poisoned");
        state.visited_at.clone()
    }

    /// Snapshot of all scraped data
    pub fn data_map(&self) -> HashMap<String, ScrapedData> {
        let state = self.state.lock().expect("coordinator state poisoned");
        state.data.clone()
    }

    /// Snapshot of the skip map
    pub fn skipped(&self) -> HashMap<String, String> {
        let state = self.state.lock().expect("coordinator state poisoned");
        state.skipped.clone()
    }

    /// Merges extraction-time skips into the request skip map
    pub fn absorb_skips(&self, skips: HashMap<String, String>) {
        let mut state = self.state.lock().expect("coordinator state poisoned");
        for (href, reason) in skips {
            state.skipped.entry(href).or_insert(reason);
        }
    }
}
