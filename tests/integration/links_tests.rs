//! Integration tests for the links engine
//!
//! These tests use wiremock to serve small sites and exercise the full
//! request pipeline end-to-end: kin scraping, tree assembly, caching, and
//! error handling.

use linkarbor::cache::{tree_key, CacheStore, MemoryCache};
use linkarbor::config::{Config, PlatformEntry};
use linkarbor::links::{LinksOptions, LinksResponse, LinksSuccessResponse, Orchestrator};
use linkarbor::scrape::HttpFetcher;
use linkarbor::tree::{LinksOrder, TreeNode};
use linkarbor::url::normalize_url;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts a 200 HTML page at the given path
async fn mock_page(server: &MockServer, page_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Builds an engine backed by the default in-memory cache
fn engine() -> Orchestrator {
    Orchestrator::new(Config::default()).expect("failed to build engine")
}

/// Builds an engine sharing an externally visible memory cache
fn engine_with_cache(config: Config, cache: Arc<MemoryCache>) -> Orchestrator {
    let fetcher = Arc::new(
        HttpFetcher::new(&config.user_agent, config.crawler.fetch_timeout_secs)
            .expect("failed to build fetcher"),
    );
    Orchestrator::with_parts(config, fetcher, cache)
}

/// Runs a request and unwraps the success variant
async fn run_success(orchestrator: &Orchestrator, options: &LinksOptions) -> LinksSuccessResponse {
    match orchestrator
        .process_links_request(options, CancellationToken::new())
        .await
    {
        LinksResponse::Success(response) => response,
        LinksResponse::Error(error) => panic!("expected success, got error: {}", error.error),
    }
}

/// Finds a node by URL anywhere in a subtree
fn find_node<'a>(node: &'a TreeNode, url: &str) -> Option<&'a TreeNode> {
    if node.url == url {
        return Some(node);
    }
    node.children
        .iter()
        .flatten()
        .find_map(|child| find_node(child, url))
}

#[tokio::test]
async fn test_tree_request_builds_hierarchy() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(
        &server,
        "/blog/post-1",
        r#"<html><head><title>Post 1</title></head><body>
            <a href="/blog">Blog</a>
            <a href="/blog/post-2">Next</a>
            <a href="https://other.com/x">Elsewhere</a>
        </body></html>"#,
    )
    .await;
    mock_page(&server, "/", r#"<html><body><a href="/blog">Blog</a></body></html>"#).await;
    mock_page(
        &server,
        "/blog",
        r#"<html><body><a href="/blog/post-1">P1</a><a href="/blog/post-2">P2</a></body></html>"#,
    )
    .await;
    mock_page(&server, "/blog/post-2", "<html><body>Post 2</body></html>").await;

    let orchestrator = engine();
    let options = LinksOptions::new(&format!("{}/blog/post-1", base));
    let response = run_success(&orchestrator, &options).await;

    let tree = response.tree.expect("tree mode must return a tree");
    let root_url = normalize_url(&base).unwrap().to_string();
    assert_eq!(tree.root.url, root_url);
    assert_eq!(tree.root_url, root_url);

    // /blog is a folder holding both posts
    let blog = find_node(&tree.root, &format!("{}/blog", base)).expect("blog node");
    let child_names: Vec<&str> = blog
        .children
        .iter()
        .flatten()
        .filter_map(|c| c.name.as_deref())
        .collect();
    assert!(child_names.contains(&"post-1"));
    assert!(child_names.contains(&"post-2"));

    // The external link is nowhere in the tree
    let mut urls = Vec::new();
    tree.root.walk(&mut |node| urls.push(node.url.clone()));
    assert!(urls.iter().all(|url| !url.contains("other.com")));

    // Ancestors reported shallow to deep
    let ancestors = response.ancestors.expect("ancestors present in tree mode");
    assert_eq!(ancestors.len(), 2);
    assert!(ancestors[0].ends_with('/'));

    // The scraped target carries a visit timestamp
    let target = find_node(&tree.root, &format!("{}/blog/post-1", base)).expect("target node");
    assert!(target.last_visited.is_some());
    assert!(tree.total_urls >= 4);
}

#[tokio::test]
async fn test_non_tree_request_and_cache_round_trip() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(
        &server,
        "/blog/post-1",
        r#"<html><head><title>Post 1</title>
            <meta name="description" content="First post"></head>
            <body><a href="/blog/post-2">Next</a></body></html>"#,
    )
    .await;

    let orchestrator = engine();
    let mut options = LinksOptions::new(&format!("{}/blog/post-1", base));
    options.tree = false;
    options.metadata = true;
    options.extracted_links = true;

    let first = run_success(&orchestrator, &options).await;
    assert!(first.tree.is_none());
    assert!(!first.cached);
    assert_eq!(first.title.as_deref(), Some("Post 1"));
    let metadata = first.metadata.as_ref().expect("metadata at response root");
    assert_eq!(metadata.description.as_deref(), Some("First post"));
    let links = first.extracted_links.as_ref().expect("extracted links");
    assert_eq!(links.internal.len(), 1);
    assert!(links.internal[0].ends_with("/blog/post-2"));

    // The write is fire-and-forget; give it a moment to land
    tokio::time::sleep(Duration::from_millis(300)).await;

    let second = run_success(&orchestrator, &options).await;
    assert!(second.cached);
    assert!(second.tree.is_none());
    assert_eq!(second.title.as_deref(), Some("Post 1"));
    assert!(second.timestamp >= first.timestamp);
}

#[tokio::test]
async fn test_platform_url_scopes_tree_to_subtree() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(
        &server,
        "/alice",
        r#"<html><body>
            <a href="/alice/repo">Repo</a>
            <a href="/bob">Sibling</a>
        </body></html>"#,
    )
    .await;
    mock_page(&server, "/alice/repo", "<html><body>Repo</body></html>").await;

    // Register the mock origin as a platform
    let mut config = Config::default();
    config.platform.push(PlatformEntry {
        origin: normalize_url(&base).unwrap().origin().ascii_serialization(),
    });

    let orchestrator = Orchestrator::new(config).unwrap();
    let options = LinksOptions::new(&format!("{}/alice", base));
    let response = run_success(&orchestrator, &options).await;

    let tree = response.tree.expect("tree");
    assert_eq!(tree.root.url, format!("{}/alice", base));

    assert!(find_node(&tree.root, &format!("{}/alice/repo", base)).is_some());
    assert!(find_node(&tree.root, &format!("{}/bob", base)).is_none());
}

#[tokio::test]
async fn test_target_failure_returns_error_with_cached_tree() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(&server, "/", r#"<html><body><a href="/ok">Ok</a></body></html>"#).await;
    mock_page(&server, "/ok", "<html><body>Fine</body></html>").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let orchestrator = engine();

    // Warm the tree cache for this root
    let warm = run_success(&orchestrator, &LinksOptions::new(&format!("{}/", base))).await;
    assert!(warm.tree.is_some());
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The broken target shares the root, so the error carries the tree
    let response = orchestrator
        .process_links_request(
            &LinksOptions::new(&format!("{}/broken", base)),
            CancellationToken::new(),
        )
        .await;

    match response {
        LinksResponse::Error(error) => {
            assert!(!error.success);
            assert!(error.error.contains("500"), "error was: {}", error.error);
            assert!(error.tree.is_some(), "cached tree should be attached");
        }
        LinksResponse::Success(_) => panic!("expected error response"),
    }
}

#[tokio::test]
async fn test_invalid_url_is_error() {
    let orchestrator = engine();
    let response = orchestrator
        .process_links_request(&LinksOptions::new("not a url"), CancellationToken::new())
        .await;

    match response {
        LinksResponse::Error(error) => assert!(!error.success),
        LinksResponse::Success(_) => panic!("expected error response"),
    }
}

#[tokio::test]
async fn test_tree_cache_reused_across_content_flags() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body><a href="/page">Page</a></body></html>"#,
    )
    .await;
    mock_page(&server, "/page", "<html><body><p>Content</p></body></html>").await;

    let cache = Arc::new(MemoryCache::new());
    let orchestrator = engine_with_cache(Config::default(), Arc::clone(&cache));

    // First request: no cleaned HTML
    let first_options = LinksOptions::new(&format!("{}/", base));
    let first = run_success(&orchestrator, &first_options).await;
    assert_eq!(first.cache_fresh, Some(false));
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Second request differs only in the cleanedHTML content flag
    let mut second_options = LinksOptions::new(&format!("{}/", base));
    second_options.cleaned_html = true;
    let second = run_success(&orchestrator, &second_options).await;

    // The tree was reused (the key ignores content flags)...
    assert_eq!(second.cache_fresh, Some(true));

    // ...and the response tree is enriched with cleaned HTML this pass
    let tree = second.tree.expect("tree");
    let root_node = find_node(&tree.root, &normalize_url(&base).unwrap().to_string()).unwrap();
    assert!(root_node.cleaned_html.is_some());

    // The persisted tree never carries cleaned HTML
    let root = normalize_url(&base).unwrap();
    let key = tree_key(&root, &second_options);
    let entry = cache
        .get_with_metadata(&key)
        .await
        .unwrap()
        .expect("tree cached");
    assert!(!entry.value.contains("cleanedHTML"));
}

#[tokio::test]
async fn test_cached_visited_urls_refreshed_without_live_link() {
    let server = MockServer::start().await;
    let base = server.uri();

    // The first request sees a link to /page; afterwards the root page
    // stops linking to it
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/page">Page</a></body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>No links anymore</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    mock_page(&server, "/page", "<html><body>Still here</body></html>").await;

    let orchestrator = engine();
    let options = LinksOptions::new(&format!("{}/", base));

    let first = run_success(&orchestrator, &options).await;
    let first_tree = first.tree.expect("tree");
    let page_url = format!("{}/page", base);
    let first_visit = find_node(&first_tree.root, &page_url)
        .expect("page node")
        .last_visited
        .expect("page visited");
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The cached tree remembers /page as visited, so the second request
    // re-scrapes it even though the live root page no longer links there
    let second = run_success(&orchestrator, &options).await;
    let second_tree = second.tree.expect("tree");
    let second_visit = find_node(&second_tree.root, &page_url)
        .expect("page node kept")
        .last_visited
        .expect("page visited again");

    assert!(second_visit > first_visit);
}

#[tokio::test]
async fn test_folder_first_alphabetical_ordering() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/zoo">Zoo</a>
            <a href="/blog/post">Post</a>
            <a href="/apple">Apple</a>
            <a href="/wiki/page">Wiki</a>
        </body></html>"#,
    )
    .await;
    for p in ["/zoo", "/apple", "/blog/post", "/wiki/page"] {
        mock_page(&server, p, "<html><body>x</body></html>").await;
    }

    let orchestrator = engine();
    let mut options = LinksOptions::new(&format!("{}/", base));
    options.folder_first = true;
    options.links_order = LinksOrder::Alphabetical;

    let response = run_success(&orchestrator, &options).await;
    let tree = response.tree.expect("tree");

    let names: Vec<String> = tree
        .root
        .children
        .iter()
        .flatten()
        .map(|c| c.name.clone().unwrap_or_default())
        .collect();

    // Folders alphabetical, then leaves alphabetical
    assert_eq!(names, ["blog", "wiki", "apple", "zoo"]);
}

#[tokio::test]
async fn test_skipped_urls_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/missing">Missing</a>
            <a href="javascript:void(0)">JS</a>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let orchestrator = engine();
    let response = run_success(&orchestrator, &LinksOptions::new(&format!("{}/", base))).await;

    let skipped = response.skipped_urls.expect("skips recorded");
    assert!(skipped
        .internal
        .iter()
        .any(|entry| entry.url.ends_with("/missing") && entry.reason.contains("404")));
    assert!(skipped
        .other
        .iter()
        .any(|entry| entry.url.starts_with("javascript:")));
}

#[tokio::test]
async fn test_metrics_attached_when_enabled() {
    let server = MockServer::start().await;
    let base = server.uri();
    mock_page(&server, "/", "<html><body>Home</body></html>").await;

    let orchestrator = engine();
    let mut options = LinksOptions::new(&format!("{}/", base));
    options.metrics_options.enable = true;

    let response = run_success(&orchestrator, &options).await;
    let metrics = response.metrics.expect("metrics attached");
    assert!(metrics.end_time_ms >= metrics.start_time_ms);
    assert!(!metrics.readable_duration.is_empty());
}

#[tokio::test]
async fn test_robots_and_sitemap_captured_for_root() {
    let server = MockServer::start().await;
    let base = server.uri();

    mock_page(&server, "/", "<html><body>Home</body></html>").await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    "User-agent: *\nDisallow: /private\nSitemap: {}/sitemap.xml",
                    base
                ))
                .insert_header("content-type", "text/plain"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<urlset></urlset>")
                .insert_header("content-type", "application/xml"),
        )
        .mount(&server)
        .await;

    let orchestrator = engine();
    let mut options = LinksOptions::new(&format!("{}/", base));
    options.tree = false;
    options.robots = true;
    options.sitemap_xml = true;

    let response = run_success(&orchestrator, &options).await;
    let meta = response.meta_files.expect("meta files captured");
    assert!(meta.robots_txt.unwrap().contains("Disallow: /private"));
    assert_eq!(meta.sitemap_xml.as_deref(), Some("<urlset></urlset>"));
    assert_eq!(meta.sitemaps, [format!("{}/sitemap.xml", base)]);
    assert_eq!(meta.robots_allows_target, Some(true));
}

#[tokio::test]
async fn test_cache_disabled_refetches() {
    let server = MockServer::start().await;
    let base = server.uri();
    mock_page(&server, "/only", "<html><head><title>Only</title></head></html>").await;

    let orchestrator = engine();
    let mut options = LinksOptions::new(&format!("{}/only", base));
    options.tree = false;
    options.cache_options.enabled = false;

    let first = run_success(&orchestrator, &options).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = run_success(&orchestrator, &options).await;

    assert!(!first.cached);
    assert!(!second.cached);
}
