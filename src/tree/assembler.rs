//! Tree assembly and merging
//!
//! Converts a flat set of internal URLs into a hierarchical tree rooted
//! at the crawl root, and merges newly discovered URLs into a cached tree
//! without losing earlier visits or metadata (monotonic enrichment: new
//! values overwrite, absent values never erase).

use crate::extract::{ExtractedLinks, PageMetadata};
use crate::tree::{LinksOrder, Tree, TreeNode, TreeOptions};
use crate::url::{is_path_descendant, path_segments};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use url::Url;

/// Per-URL inputs to tree assembly
///
/// All maps are keyed by normalized URL string. The visited map is always
/// populated; the content maps may be empty when the request did not ask
/// for that content.
#[derive(Debug, Clone, Copy)]
pub struct TreeInputs<'a> {
    /// Internal links discovered this request
    pub internal_links: &'a [Url],
    /// Visit timestamps stamped this request
    pub visited: &'a HashMap<String, DateTime<Utc>>,
    /// Metadata per scraped URL (always collected in tree mode)
    pub metadata: &'a HashMap<String, PageMetadata>,
    /// Cleaned HTML per scraped URL
    pub cleaned_html: &'a HashMap<String, String>,
    /// Extracted link buckets per scraped URL
    pub extracted_links: &'a HashMap<String, ExtractedLinks>,
}

/// Builds a tree from scratch
///
/// Every URL in the internal link set and the visited set that is a path
/// descendant of the root (or the root itself) becomes a node; URLs
/// outside the root's subtree are ignored. Ordering and `total_urls` are
/// applied before returning.
///
/// # Arguments
///
/// * `root_url` - The crawl root; becomes the tree's root node
/// * `inputs` - Per-URL assembly inputs
/// * `options` - Ordering options
pub fn build_tree(root_url: &Url, inputs: &TreeInputs, options: &TreeOptions) -> Tree {
    let now = Utc::now();
    let root = TreeNode::new(root_url.to_string(), None, now);

    let mut tree = Tree {
        root,
        total_urls: 1,
        root_url: root_url.to_string(),
        skipped_urls: None,
    };

    insert_all(&mut tree.root, root_url, inputs, now);
    enrich(&mut tree.root, inputs, now);
    apply_order(&mut tree.root, options);
    tree.total_urls = tree.root.count();

    tree
}

/// Merges new discoveries into an existing tree
///
/// Starts from a deep copy of `existing`. URLs already present are kept;
/// new internal links are inserted with the same walk as `build_tree`.
/// Fresh visit timestamps overwrite older ones and bump `last_updated`
/// on the affected node and its ancestors. Content maps overwrite
/// per-field when present and never erase existing values.
///
/// No URL is ever removed by merging.
pub fn merge_into_tree(
    existing: &Tree,
    root_url: &Url,
    inputs: &TreeInputs,
    options: &TreeOptions,
) -> Tree {
    let now = Utc::now();
    let mut tree = existing.clone();

    insert_all(&mut tree.root, root_url, inputs, now);
    enrich(&mut tree.root, inputs, now);
    apply_order(&mut tree.root, options);
    tree.total_urls = tree.root.count();

    tree
}

/// Inserts every eligible URL from the inputs into the tree
fn insert_all(root: &mut TreeNode, root_url: &Url, inputs: &TreeInputs, now: DateTime<Utc>) {
    for url in inputs.internal_links {
        insert_url(root, root_url, url, now);
    }

    for url_str in inputs.visited.keys() {
        if let Ok(url) = Url::parse(url_str) {
            insert_url(root, root_url, &url, now);
        }
    }
}

/// Inserts one URL by walking its path segments relative to the root
///
/// A URL outside the root's subtree is skipped. Intermediate folder
/// nodes are created as needed; the walk is idempotent for URLs already
/// present. Node URLs are path-prefix URLs: queries and fragments do not
/// produce distinct nodes.
fn insert_url(root: &mut TreeNode, root_url: &Url, url: &Url, now: DateTime<Utc>) {
    if url.as_str() == root.url {
        return;
    }
    if !is_path_descendant(url, root_url) {
        return;
    }

    let root_segments = path_segments(root_url);
    let url_segments = path_segments(url);
    let relative = &url_segments[root_segments.len()..];

    let mut prefix = root_segments;
    let mut current = root;

    for segment in relative {
        prefix.push(segment.clone());
        let child_url = url_for_segments(root_url, &prefix);

        let children = current.children.get_or_insert_with(Vec::new);
        let index = match children.iter().position(|c| c.url == child_url) {
            Some(index) => index,
            None => {
                children.push(TreeNode::new(
                    child_url,
                    Some(decode_segment(segment)),
                    now,
                ));
                children.len() - 1
            }
        };

        current = &mut current.children.as_mut().expect("children just set")[index];
    }
}

/// Builds the URL for a cumulative segment prefix under the root
fn url_for_segments(root_url: &Url, segments: &[String]) -> String {
    let mut url = root_url.clone();
    url.set_path(&format!("/{}", segments.join("/")));
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
}

/// Percent-decodes a path segment for display
fn decode_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&segment[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Applies visit timestamps and content maps to the subtree
///
/// Returns true when this node or any descendant changed; a change
/// bumps `last_updated` on every node up the path to the root.
fn enrich(node: &mut TreeNode, inputs: &TreeInputs, now: DateTime<Utc>) -> bool {
    let mut changed = false;

    if let Some(visited_at) = inputs.visited.get(&node.url) {
        let is_newer = node
            .last_visited
            .map_or(true, |existing| *visited_at > existing);
        if is_newer {
            node.last_visited = Some(*visited_at);
            changed = true;
        }
    }

    if let Some(metadata) = inputs.metadata.get(&node.url) {
        if node.metadata.as_ref() != Some(metadata) {
            node.metadata = Some(metadata.clone());
            changed = true;
        }
    }

    if let Some(cleaned) = inputs.cleaned_html.get(&node.url) {
        node.cleaned_html = Some(cleaned.clone());
    }

    if let Some(links) = inputs.extracted_links.get(&node.url) {
        node.extracted_links = Some(links.clone());
    }

    for child in node.children.iter_mut().flatten() {
        changed |= enrich(child, inputs, now);
    }

    if changed {
        node.last_updated = now;
    }

    changed
}

/// Applies sibling ordering recursively
///
/// Alphabetical ordering sorts by name first; the folder-first pass is a
/// stable partition afterwards, so ordering within each grouping is
/// preserved.
fn apply_order(node: &mut TreeNode, options: &TreeOptions) {
    if let Some(children) = node.children.as_mut() {
        if options.links_order == LinksOrder::Alphabetical {
            children.sort_by(|a, b| a.name.cmp(&b.name));
        }

        if options.folder_first {
            children.sort_by_key(|child| child.children.is_none());
        }

        for child in children {
            apply_order(child, options);
        }
    }
}
