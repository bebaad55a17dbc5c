//! Cache key derivation
//!
//! Two keying schemes share one KV namespace, distinguished by prefix:
//!
//! - The tree key covers the normalized root URL plus only the options
//!   that affect tree shape. Content options (metadata, cleaned HTML)
//!   deliberately do not participate, so requests differing only in
//!   content flags share one cached tree.
//! - The non-tree key covers the entire normalized option set, including
//!   the HTTP method and all content flags.

use crate::links::LinksOptions;
use sha2::{Digest, Sha256};
use url::Url;

/// Derives the cache key for a tree-mode request
///
/// # Arguments
///
/// * `root_url` - The normalized crawl root
/// * `options` - The request options; only shape-affecting fields are
///   read
pub fn tree_key(root_url: &Url, options: &LinksOptions) -> String {
    let fingerprint = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        root_url.as_str(),
        options.subdomain_as_root_url,
        options.is_platform_url,
        options.folder_first,
        options.links_order.as_str(),
        options.extracted_links,
        options.link_extraction_options.include_external,
        options.link_extraction_options.include_media,
    );

    format!("tree:{}", sha256_hex(&fingerprint))
}

/// Derives the cache key for a non-tree request
///
/// # Arguments
///
/// * `normalized_url` - The normalized target URL
/// * `options` - The full request options
pub fn non_tree_key(normalized_url: &Url, options: &LinksOptions) -> String {
    let mut headers: Vec<String> = options
        .fetch_options
        .headers
        .iter()
        .map(|(name, value)| format!("{}={}", name.to_ascii_lowercase(), value))
        .collect();
    headers.sort();

    let fingerprint = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{:?}|{}",
        normalized_url.as_str(),
        options.tree,
        options.extracted_links,
        options.metadata,
        options.cleaned_html,
        options.robots,
        options.sitemap_xml,
        options.subdomain_as_root_url,
        options.is_platform_url,
        options.folder_first,
        options.links_order.as_str(),
        options.cleaning_processor.as_str(),
        options.metrics_options.enable,
        options.link_extraction_options.include_external,
        options.link_extraction_options.include_media,
        options.fetch_options.redirect,
        options.fetch_options.method.as_str(),
    ) + "|"
        + &headers.join(",");

    format!("flat:{}", sha256_hex(&fingerprint))
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::FetchMethod;
    use crate::url::normalize_url;

    fn options(url: &str) -> LinksOptions {
        LinksOptions::new(url)
    }

    #[test]
    fn test_tree_key_stable() {
        let root = normalize_url("https://example.com/").unwrap();
        let opts = options("https://example.com/a");
        assert_eq!(tree_key(&root, &opts), tree_key(&root, &opts));
    }

    #[test]
    fn test_tree_key_ignores_content_options() {
        let root = normalize_url("https://example.com/").unwrap();
        let base = options("https://example.com/a");

        let mut with_content = base.clone();
        with_content.cleaned_html = true;
        with_content.metadata = true;
        with_content.robots = true;

        assert_eq!(tree_key(&root, &base), tree_key(&root, &with_content));
    }

    #[test]
    fn test_tree_key_varies_on_shape_options() {
        let root = normalize_url("https://example.com/").unwrap();
        let base = options("https://example.com/a");

        let mut folder_first = base.clone();
        folder_first.folder_first = true;
        assert_ne!(tree_key(&root, &base), tree_key(&root, &folder_first));

        let mut platform = base.clone();
        platform.is_platform_url = true;
        assert_ne!(tree_key(&root, &base), tree_key(&root, &platform));

        let mut extracted = base.clone();
        extracted.extracted_links = true;
        assert_ne!(tree_key(&root, &base), tree_key(&root, &extracted));
    }

    #[test]
    fn test_tree_key_varies_on_root() {
        let opts = options("https://example.com/a");
        let root_a = normalize_url("https://example.com/").unwrap();
        let root_b = normalize_url("https://other.com/").unwrap();
        assert_ne!(tree_key(&root_a, &opts), tree_key(&root_b, &opts));
    }

    #[test]
    fn test_non_tree_key_varies_on_content_options() {
        let url = normalize_url("https://example.com/a").unwrap();
        let base = options("https://example.com/a");

        let mut cleaned = base.clone();
        cleaned.cleaned_html = true;

        assert_ne!(non_tree_key(&url, &base), non_tree_key(&url, &cleaned));
    }

    #[test]
    fn test_non_tree_key_varies_on_method() {
        let url = normalize_url("https://example.com/a").unwrap();
        let base = options("https://example.com/a");

        let mut head = base.clone();
        head.fetch_options.method = FetchMethod::Head;

        assert_ne!(non_tree_key(&url, &base), non_tree_key(&url, &head));
    }

    #[test]
    fn test_non_tree_key_header_order_irrelevant() {
        let url = normalize_url("https://example.com/a").unwrap();
        let mut a = options("https://example.com/a");
        a.fetch_options.headers.insert("A".into(), "1".into());
        a.fetch_options.headers.insert("B".into(), "2".into());

        let mut b = options("https://example.com/a");
        b.fetch_options.headers.insert("B".into(), "2".into());
        b.fetch_options.headers.insert("A".into(), "1".into());

        assert_eq!(non_tree_key(&url, &a), non_tree_key(&url, &b));
    }

    #[test]
    fn test_keyspaces_disjoint() {
        let url = normalize_url("https://example.com/").unwrap();
        let opts = options("https://example.com/");
        let tree = tree_key(&url, &opts);
        let flat = non_tree_key(&url, &opts);

        assert!(tree.starts_with("tree:"));
        assert!(flat.starts_with("flat:"));
        assert_ne!(tree, flat);
    }
}
