//! Links request orchestration
//!
//! The orchestrator is the top-level engine for one request: it selects
//! tree vs non-tree mode, reads the cache, fans out bounded parallel
//! scrapes of the target's kin, feeds the results to the tree assembler,
//! and issues the fire-and-forget cache write.
//!
//! Failure policy: only a failed target scrape (or an invalid target URL)
//! turns the request into an error response. Every other failure is
//! absorbed - non-target scrapes become skip reasons, cache problems are
//! logged and ignored.

use crate::cache::{
    non_tree_key, spawn_put_with_retry, tree_key, CacheStore, MemoryCache, SideMetadata,
    SqliteCache,
};
use crate::config::Config;
use crate::extract::{extract_links_from_html, ExtractedLinks, PageMetadata};
use crate::links::options::LinksOptions;
use crate::links::response::{LinksResponse, LinksSuccessResponse, RequestMetrics};
use crate::scrape::{Fetcher, HttpFetcher, ScrapeCoordinator, ScrapeOptions};
use crate::tree::{
    build_tree, merge_into_tree, SkippedBuckets, SkippedEntry, Tree, TreeInputs, TreeOptions,
};
use crate::url::{
    ancestor_paths, compare_kin, derive_root_url, descendant_paths, is_platform_url, is_same_root,
    media_bucket, normalize_url,
};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// The links request engine
///
/// One instance serves many requests; all per-request state lives in a
/// [`ScrapeCoordinator`] created per call.
pub struct Orchestrator {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
}

impl Orchestrator {
    /// Creates an engine from configuration
    ///
    /// The cache backend is selected by `cache.database-path`: empty
    /// picks the in-memory store, anything else opens a SQLite database
    /// at that path.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
            &config.user_agent,
            config.crawler.fetch_timeout_secs,
        )?);

        let cache: Arc<dyn CacheStore> = if config.cache.database_path.is_empty() {
            Arc::new(MemoryCache::new())
        } else {
            Arc::new(SqliteCache::new(Path::new(&config.cache.database_path))?)
        };

        Ok(Self {
            config,
            fetcher,
            cache,
        })
    }

    /// Creates an engine from explicit parts (test seam)
    pub fn with_parts(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            config,
            fetcher,
            cache,
        }
    }

    /// Processes one links request
    ///
    /// Never returns an `Err`: every failure mode maps to a
    /// [`LinksResponse`] variant.
    pub async fn process_links_request(
        &self,
        options: &LinksOptions,
        cancel: CancellationToken,
    ) -> LinksResponse {
        let request_id = Uuid::new_v4();
        let started = Utc::now();

        if let Err(e) = options.validate() {
            return LinksResponse::error(request_id, &options.url, e.to_string(), None);
        }

        let target = match normalize_url(&options.url) {
            Ok(target) => target,
            Err(e) => {
                return LinksResponse::error(
                    request_id,
                    &options.url,
                    format!("Invalid URL: {}", e),
                    None,
                );
            }
        };

        tracing::info!("Processing links request {} for {}", request_id, target);

        if options.tree {
            self.process_tree(request_id, started, target, options, cancel)
                .await
        } else {
            self.process_non_tree(request_id, started, target, options, cancel)
                .await
        }
    }

    /// Non-tree mode: one scrape of the target, content at the response
    /// root, cached under the full-option key
    async fn process_non_tree(
        &self,
        request_id: Uuid,
        started: DateTime<Utc>,
        target: Url,
        options: &LinksOptions,
        cancel: CancellationToken,
    ) -> LinksResponse {
        let platform = is_platform_url(&target, options.is_platform_url, &self.config.platform);
        let root = match derive_root_url(&target, options.subdomain_as_root_url, &self.config.platform)
        {
            Ok(root) => root,
            Err(e) => {
                return LinksResponse::error(request_id, target.as_str(), e.to_string(), None);
            }
        };

        let key = non_tree_key(&target, options);
        let cache_enabled = options.cache_options.enabled;

        if cache_enabled {
            if let Some(mut cached) = self.read_cached_response(&key).await {
                tracing::debug!("Non-tree cache hit for {}", target);
                cached.request_id = request_id;
                cached.cached = true;
                cached.timestamp = Utc::now();
                cached.metrics = options
                    .metrics_options
                    .enable
                    .then(|| RequestMetrics::since(started));
                return LinksResponse::Success(cached);
            }
        }

        let coordinator = ScrapeCoordinator::new(
            Arc::clone(&self.fetcher),
            root.clone(),
            target.clone(),
            self.config.user_agent.crawler_name.clone(),
        );
        let scrape_options = self.scrape_options(options);

        let data = match coordinator
            .scrape_if_not_visited(&target, &scrape_options, &cancel)
            .await
        {
            Some(data) => data,
            None => {
                let reason = coordinator
                    .skipped()
                    .get(target.as_str())
                    .cloned()
                    .unwrap_or_else(|| "Failed to scrape target".to_string());
                return LinksResponse::error(request_id, target.as_str(), reason, None);
            }
        };

        // Extraction always runs so skips are recorded; the bucket field
        // itself is gated by the extractedLinks flag
        let mut extraction_skips = HashMap::new();
        let base = Url::parse(&data.final_url).unwrap_or_else(|_| target.clone());
        let links = extract_links_from_html(
            &data.raw_html,
            &base,
            &root,
            &options.link_extraction_options,
            platform,
            &mut extraction_skips,
        );
        coordinator.absorb_skips(extraction_skips);

        let skipped = bucketize_skipped(&coordinator.skipped(), &root);

        let response = LinksSuccessResponse {
            request_id,
            success: true,
            cached: false,
            target_url: target.to_string(),
            timestamp: Utc::now(),
            ancestors: None,
            tree: None,
            cache_fresh: None,
            title: data.title.clone(),
            description: data.description.clone(),
            // Metadata is forced on in non-tree mode
            metadata: data.metadata.clone(),
            cleaned_html: data.cleaned_html.clone(),
            extracted_links: options.extracted_links.then_some(links),
            meta_files: data.meta_files.clone(),
            metrics: options
                .metrics_options
                .enable
                .then(|| RequestMetrics::since(started)),
            skipped_urls: (!skipped.is_empty()).then_some(skipped),
        };

        if cache_enabled {
            self.write_response_to_cache(&key, &response, options);
        }

        LinksResponse::Success(response)
    }

    /// Tree mode: the full kin pipeline
    async fn process_tree(
        &self,
        request_id: Uuid,
        started: DateTime<Utc>,
        target: Url,
        options: &LinksOptions,
        cancel: CancellationToken,
    ) -> LinksResponse {
        let platform = is_platform_url(&target, options.is_platform_url, &self.config.platform);
        let root = match derive_root_url(&target, options.subdomain_as_root_url, &self.config.platform)
        {
            Ok(root) => root,
            Err(e) => {
                return LinksResponse::error(request_id, target.as_str(), e.to_string(), None);
            }
        };

        let ancestors = ancestor_paths(&target);
        let root_key = tree_key(&root, options);
        let cache_enabled = options.cache_options.enabled;
        let kin_limit = self.config.crawler.kin_limit;

        // Cache read: a hit seeds the merge, supplies the previously
        // visited set, and marks the tree as fresh
        let mut existing_tree: Option<Tree> = None;
        if cache_enabled {
            existing_tree = self.read_cached_tree(&root_key).await;
        }
        let cache_fresh = existing_tree.is_some();
        let previously_visited: Vec<Url> = existing_tree
            .as_ref()
            .map(|tree| {
                tree.visited_urls()
                    .iter()
                    .filter_map(|url| Url::parse(url).ok())
                    .collect()
            })
            .unwrap_or_default();

        let coordinator = Arc::new(ScrapeCoordinator::new(
            Arc::clone(&self.fetcher),
            root.clone(),
            target.clone(),
            self.config.user_agent.crawler_name.clone(),
        ));
        let scrape_options = self.scrape_options(options);

        // Phase A: target, root (or the tenant-level ancestor in platform
        // mode), and the remaining ancestors, all through one bounded pool
        let mut first_wave: Vec<Url> = vec![target.clone()];
        if target != root {
            if platform {
                if let Some(tenant) = ancestors.get(1) {
                    first_wave.push(tenant.clone());
                }
            } else {
                first_wave.push(root.clone());
            }
        }
        let mut other_ancestors: Vec<Url> = ancestors
            .iter()
            .filter(|a| **a != root && **a != target)
            .cloned()
            .collect();
        other_ancestors.truncate(kin_limit);
        first_wave.extend(other_ancestors);
        dedupe_urls(&mut first_wave);

        self.run_scrapes(&coordinator, first_wave, &scrape_options, &cancel)
            .await;

        // The target scrape alone is fatal
        if coordinator.data_for(&target).is_none() {
            let reason = coordinator
                .skipped()
                .get(target.as_str())
                .cloned()
                .unwrap_or_else(|| "Failed to scrape target".to_string());
            return LinksResponse::error(request_id, target.as_str(), reason, existing_tree);
        }

        // Accumulate classified links from everything scraped so far
        let mut extraction = LinkAccumulator::default();
        self.collect_links(&coordinator, &root, options, platform, &mut extraction);

        // Descendant candidates come from this request's link set plus
        // the previously visited URLs of the cached tree, so known kin
        // are refreshed even when no current page still links to them

        // Phase B: the root's own descendants (non-platform only)
        if target != root && !platform {
            let candidates = descendant_candidates(&extraction.internal, &previously_visited);
            let root_descendants =
                take_unvisited(descendant_paths(&root, &candidates), &coordinator, kin_limit);
            self.run_scrapes(&coordinator, root_descendants, &scrape_options, &cancel)
                .await;
            self.collect_links(&coordinator, &root, options, platform, &mut extraction);
        }

        // Phase C: descendants of the target, scraped only when the
        // target is itself the root (otherwise they enter the tree from
        // the accumulated link set without being fetched)
        if target == root {
            let candidates = descendant_candidates(&extraction.internal, &previously_visited);
            let target_descendants = descendant_paths(&target, &candidates);
            let wave = take_unvisited(target_descendants, &coordinator, kin_limit);
            self.run_scrapes(&coordinator, wave, &scrape_options, &cancel)
                .await;
            self.collect_links(&coordinator, &root, options, platform, &mut extraction);
        }

        // Assemble or merge the tree
        let visited = coordinator.visited_timestamps();
        let data_map = coordinator.data_map();

        let mut metadata_by_url: HashMap<String, PageMetadata> = HashMap::new();
        let mut cleaned_by_url: HashMap<String, String> = HashMap::new();
        for (url, data) in &data_map {
            if let Some(metadata) = &data.metadata {
                metadata_by_url.insert(url.clone(), metadata.clone());
            }
            if options.cleaned_html {
                if let Some(cleaned) = &data.cleaned_html {
                    cleaned_by_url.insert(url.clone(), cleaned.clone());
                }
            }
        }

        let extracted_for_tree: HashMap<String, ExtractedLinks> = if options.extracted_links {
            extraction.by_url.clone()
        } else {
            HashMap::new()
        };

        let tree_inputs = TreeInputs {
            internal_links: &extraction.internal,
            visited: &visited,
            metadata: &metadata_by_url,
            cleaned_html: &cleaned_by_url,
            extracted_links: &extracted_for_tree,
        };
        let tree_options = TreeOptions {
            folder_first: options.folder_first,
            links_order: options.links_order,
        };

        let mut tree = match &existing_tree {
            Some(existing) => merge_into_tree(existing, &root, &tree_inputs, &tree_options),
            None => build_tree(&root, &tree_inputs, &tree_options),
        };

        let skipped = bucketize_skipped(&coordinator.skipped(), &root);
        tree.skipped_urls = (!skipped.is_empty()).then_some(skipped);

        // Persist a stripped copy: the cached tree never carries cleaned
        // HTML or extracted links
        if cache_enabled {
            self.write_tree_to_cache(&root_key, &tree, &metadata_by_url, options);
        }

        let response = LinksSuccessResponse {
            request_id,
            success: true,
            cached: cache_fresh,
            target_url: target.to_string(),
            timestamp: Utc::now(),
            ancestors: Some(ancestors.iter().map(|u| u.to_string()).collect()),
            cache_fresh: Some(cache_fresh),
            skipped_urls: tree.skipped_urls.clone(),
            tree: Some(tree),
            title: None,
            description: None,
            metadata: None,
            cleaned_html: None,
            extracted_links: None,
            meta_files: None,
            metrics: options
                .metrics_options
                .enable
                .then(|| RequestMetrics::since(started)),
        };

        LinksResponse::Success(response)
    }

    /// Resolves the per-scrape option set for this request
    fn scrape_options(&self, options: &LinksOptions) -> ScrapeOptions {
        ScrapeOptions {
            cleaned_html: options.cleaned_html,
            cleaning_processor: options.cleaning_processor,
            robots: options.robots,
            sitemap_xml: options.sitemap_xml,
            fetch: options.fetch_options.clone(),
        }
    }

    /// Fans a batch of URLs out through the bounded scrape pool
    ///
    /// All-settled semantics: every scrape runs to completion (success,
    /// skip, or cancellation) before this returns.
    async fn run_scrapes(
        &self,
        coordinator: &Arc<ScrapeCoordinator>,
        urls: Vec<Url>,
        options: &ScrapeOptions,
        cancel: &CancellationToken,
    ) {
        let bound = self.config.crawler.max_concurrent_scrapes.max(1);

        stream::iter(urls.into_iter().map(|url| {
            let coordinator = Arc::clone(coordinator);
            let options = options.clone();
            let cancel = cancel.clone();
            async move {
                coordinator
                    .scrape_if_not_visited(&url, &options, &cancel)
                    .await;
            }
        }))
        .buffer_unordered(bound)
        .collect::<Vec<()>>()
        .await;
    }

    /// Extracts links from every scraped page not yet processed
    ///
    /// Pages are processed in kin order so the internal link sequence
    /// (and with it, page-order trees) is deterministic.
    fn collect_links(
        &self,
        coordinator: &ScrapeCoordinator,
        root: &Url,
        options: &LinksOptions,
        platform: bool,
        accumulator: &mut LinkAccumulator,
    ) {
        let data_map = coordinator.data_map();

        let mut page_urls: Vec<Url> = data_map
            .keys()
            .filter(|url| !accumulator.extracted_pages.contains(*url))
            .filter_map(|url| Url::parse(url).ok())
            .collect();
        page_urls.sort_by(compare_kin);

        for page_url in page_urls {
            let data = match data_map.get(page_url.as_str()) {
                Some(data) => data,
                None => continue,
            };
            accumulator.extracted_pages.insert(page_url.to_string());

            let base = Url::parse(&data.final_url).unwrap_or_else(|_| page_url.clone());
            let mut skips = HashMap::new();
            let links = extract_links_from_html(
                &data.raw_html,
                &base,
                root,
                &options.link_extraction_options,
                platform,
                &mut skips,
            );
            coordinator.absorb_skips(skips);

            for link in links.internal_urls() {
                if accumulator.internal_seen.insert(link.to_string()) {
                    accumulator.internal.push(link);
                }
            }
            accumulator.by_url.insert(page_url.to_string(), links);
        }
    }

    /// Reads and deserializes a cached non-tree response; failures are
    /// logged and treated as misses
    async fn read_cached_response(&self, key: &str) -> Option<LinksSuccessResponse> {
        match self.cache.get_with_metadata(key).await {
            Ok(Some(entry)) => match serde_json::from_str(&entry.value) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!("Failed to deserialize cached response: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed: {}", e);
                None
            }
        }
    }

    /// Reads and deserializes a cached tree; failures are logged and
    /// treated as misses
    async fn read_cached_tree(&self, key: &str) -> Option<Tree> {
        match self.cache.get_with_metadata(key).await {
            Ok(Some(entry)) => match serde_json::from_str(&entry.value) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    tracing::warn!("Failed to deserialize cached tree: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed: {}", e);
                None
            }
        }
    }

    /// Issues the fire-and-forget cache write for a non-tree response
    fn write_response_to_cache(
        &self,
        key: &str,
        response: &LinksSuccessResponse,
        options: &LinksOptions,
    ) {
        let json = match serde_json::to_string(response) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize response for cache: {}", e);
                return;
            }
        };

        spawn_put_with_retry(
            Arc::clone(&self.cache),
            key.to_string(),
            json,
            Duration::from_secs(options.cache_options.expiration_ttl),
            Some(SideMetadata::new(
                response.title.clone(),
                response.description.clone(),
            )),
        );
    }

    /// Issues the fire-and-forget cache write for a tree
    fn write_tree_to_cache(
        &self,
        key: &str,
        tree: &Tree,
        metadata_by_url: &HashMap<String, PageMetadata>,
        options: &LinksOptions,
    ) {
        let mut cache_tree = tree.clone();
        cache_tree.root.strip_content();

        let json = match serde_json::to_string(&cache_tree) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize tree for cache: {}", e);
                return;
            }
        };

        let root_metadata = metadata_by_url.get(&cache_tree.root_url);
        let side = SideMetadata::new(
            root_metadata.and_then(|m| m.title.clone()),
            root_metadata.and_then(|m| m.description.clone()),
        );

        spawn_put_with_retry(
            Arc::clone(&self.cache),
            key.to_string(),
            json,
            Duration::from_secs(options.cache_options.expiration_ttl),
            Some(side),
        );
    }
}

/// Accumulated link-extraction state across pipeline phases
#[derive(Default)]
struct LinkAccumulator {
    /// Internal links in first-discovery order
    internal: Vec<Url>,
    /// Dedupe set for `internal`
    internal_seen: HashSet<String>,
    /// Extracted buckets per scraped page
    by_url: HashMap<String, ExtractedLinks>,
    /// Pages already run through extraction
    extracted_pages: HashSet<String>,
}

/// Removes duplicate URLs preserving first occurrence
fn dedupe_urls(urls: &mut Vec<Url>) {
    let mut seen = HashSet::new();
    urls.retain(|url| seen.insert(url.to_string()));
}

/// Combines freshly discovered internal links with the cached tree's
/// previously visited URLs into one descendant candidate pool
fn descendant_candidates(internal: &[Url], previously_visited: &[Url]) -> Vec<Url> {
    let mut candidates: Vec<Url> = internal
        .iter()
        .chain(previously_visited.iter())
        .cloned()
        .collect();
    dedupe_urls(&mut candidates);
    candidates
}

/// Keeps the first `limit` candidates this request has not scraped yet
fn take_unvisited(candidates: Vec<Url>, coordinator: &ScrapeCoordinator, limit: usize) -> Vec<Url> {
    let data_map = coordinator.data_map();
    let skipped = coordinator.skipped();

    candidates
        .into_iter()
        .filter(|url| {
            !data_map.contains_key(url.as_str()) && !skipped.contains_key(url.as_str())
        })
        .take(limit)
        .collect()
}

/// Buckets the per-request skip map like extracted links
///
/// Entries are sorted by URL for deterministic output.
fn bucketize_skipped(skipped: &HashMap<String, String>, root: &Url) -> SkippedBuckets {
    let mut buckets = SkippedBuckets::default();

    let mut entries: Vec<(&String, &String)> = skipped.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (url_str, reason) in entries {
        let entry = SkippedEntry {
            url: url_str.clone(),
            reason: reason.clone(),
        };

        match Url::parse(url_str) {
            // Non-http schemes (javascript:, mailto:) parse but belong
            // with the unclassifiable entries
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                if media_bucket(&url).is_some() {
                    buckets.media.push(entry);
                } else if is_same_root(&url, root) {
                    buckets.internal.push(entry);
                } else {
                    buckets.external.push(entry);
                }
            }
            _ => buckets.other.push(entry),
        }
    }

    buckets
}
