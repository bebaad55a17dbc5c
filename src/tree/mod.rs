//! Links tree model
//!
//! A tree node represents one URL path prefix under the crawl root.
//! Folders are nodes with children; leaves have none. Trees are the cache
//! value for tree-mode requests, so every field here is serde-stable.

mod assembler;

pub use assembler::{build_tree, merge_into_tree, TreeInputs};

use crate::extract::{ExtractedLinks, PageMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sibling ordering policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinksOrder {
    /// Preserve insertion order of first discovery
    #[default]
    Page,
    /// Sort siblings by name ascending
    Alphabetical,
}

impl LinksOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Alphabetical => "alphabetical",
        }
    }
}

/// Ordering options applied during tree assembly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Order folder nodes before leaf nodes
    pub folder_first: bool,
    /// Sibling ordering within each grouping
    pub links_order: LinksOrder,
}

/// One node of the links tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Full URL of this path prefix
    pub url: String,

    /// URL-decoded final path segment; absent on the root node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// When this node (or a descendant) last changed
    pub last_updated: DateTime<Utc>,

    /// When this URL was last scraped, if ever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_visited: Option<DateTime<Utc>>,

    /// Child nodes; absent on leaves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,

    #[serde(rename = "cleanedHTML", skip_serializing_if = "Option::is_none")]
    pub cleaned_html: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_links: Option<ExtractedLinks>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TreeNode {
    /// Creates a bare node
    pub fn new(url: String, name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            url,
            name,
            last_updated: now,
            last_visited: None,
            children: None,
            metadata: None,
            cleaned_html: None,
            extracted_links: None,
            error: None,
        }
    }

    /// Counts the nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(TreeNode::count)
            .sum::<usize>()
    }

    /// Returns true when the given URL appears in this subtree
    pub fn contains(&self, url: &str) -> bool {
        self.url == url
            || self
                .children
                .iter()
                .flatten()
                .any(|child| child.contains(url))
    }

    /// Visits every node in the subtree
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TreeNode)) {
        visit(self);
        for child in self.children.iter().flatten() {
            child.walk(visit);
        }
    }

    /// Strips cleaned HTML and extracted links from the whole subtree
    ///
    /// The persisted form of a tree never carries these; they are merged
    /// back in by the enrichment pass of the current request only.
    pub fn strip_content(&mut self) {
        self.cleaned_html = None;
        self.extracted_links = None;
        for child in self.children.iter_mut().flatten() {
            child.strip_content();
        }
    }
}

/// A skipped URL with the reason it was skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub url: String,
    pub reason: String,
}

/// Skipped URLs bucketed like extracted links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkippedBuckets {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal: Vec<SkippedEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<SkippedEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<SkippedEntry>,
    /// Entries that could not be parsed at all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<SkippedEntry>,
}

impl SkippedBuckets {
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty()
            && self.external.is_empty()
            && self.media.is_empty()
            && self.other.is_empty()
    }
}

/// A complete links tree: the root node plus summary fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    #[serde(flatten)]
    pub root: TreeNode,

    /// Number of distinct URLs represented by the tree
    pub total_urls: usize,

    /// The crawl root URL this tree is keyed on
    pub root_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_urls: Option<SkippedBuckets>,
}

impl Tree {
    /// Collects the URLs of every node carrying a visit timestamp
    pub fn visited_urls(&self) -> Vec<String> {
        let mut visited = Vec::new();
        self.root.walk(&mut |node| {
            if node.last_visited.is_some() {
                visited.push(node.url.clone());
            }
        });
        visited
    }
}
