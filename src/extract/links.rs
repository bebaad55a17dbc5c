//! Link extraction from HTML documents
//!
//! Enumerates anchors, images, video sources, and document links, runs
//! each through the link classifier, and buckets the survivors. Rejected
//! hrefs are recorded in the per-request skip sink and are never fatal.

use crate::url::{classify_link, Classification, LinkBucket};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Options controlling which buckets the extractor emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkExtractionOptions {
    /// Emit the external bucket
    #[serde(default)]
    pub include_external: bool,

    /// Emit the media bucket
    #[serde(default)]
    pub include_media: bool,
}

impl Default for LinkExtractionOptions {
    fn default() -> Self {
        Self {
            include_external: false,
            include_media: false,
        }
    }
}

/// Media links bucketed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaLinks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<String>,
}

impl MediaLinks {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty() && self.documents.is_empty()
    }
}

/// The bucketed result of extracting links from one page
///
/// Each URL appears in at most one bucket. Buckets preserve first-seen
/// order and are deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLinks {
    #[serde(default)]
    pub internal: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaLinks>,
}

impl ExtractedLinks {
    /// Parses the internal bucket back into URLs, dropping any entry that
    /// no longer parses
    pub fn internal_urls(&self) -> Vec<Url> {
        self.internal
            .iter()
            .filter_map(|s| Url::parse(s).ok())
            .collect()
    }
}

/// Accumulates classified links into buckets with first-seen dedupe
#[derive(Default)]
struct BucketCollector {
    internal: Vec<String>,
    external: Vec<String>,
    images: Vec<String>,
    videos: Vec<String>,
    documents: Vec<String>,
    seen: HashSet<String>,
}

impl BucketCollector {
    fn add(&mut self, bucket: LinkBucket, url: Url) {
        let url = url.to_string();
        if !self.seen.insert(url.clone()) {
            return;
        }

        match bucket {
            LinkBucket::Internal => self.internal.push(url),
            LinkBucket::External => self.external.push(url),
            LinkBucket::Image => self.images.push(url),
            LinkBucket::Video => self.videos.push(url),
            LinkBucket::Document => self.documents.push(url),
        }
    }
}

/// Extracts and classifies all links from an HTML document
///
/// Sources considered: `a[href]`, `img[src]` (plus the first URL of a
/// `srcset`), `video[src]`, and `source[src]`. Every candidate runs
/// through `classify_link`; skipped candidates land in `skipped` with a
/// reason, regardless of the bucket options.
///
/// The output is deterministic for identical inputs: buckets preserve the
/// document order of first discovery.
///
/// # Arguments
///
/// * `html` - The raw HTML to scan
/// * `base_url` - The URL of the page, for resolving relative hrefs
/// * `root_url` - The crawl root, for internal/external classification
/// * `options` - Which optional buckets to emit
/// * `platform_mode` - Whether platform classification applies
/// * `skipped` - Per-request sink for rejected hrefs
pub fn extract_links_from_html(
    html: &str,
    base_url: &Url,
    root_url: &Url,
    options: &LinkExtractionOptions,
    platform_mode: bool,
    skipped: &mut HashMap<String, String>,
) -> ExtractedLinks {
    let document = Html::parse_document(html);
    let mut collector = BucketCollector::default();

    let mut classify = |href: &str, collector: &mut BucketCollector| {
        match classify_link(href, base_url, root_url, platform_mode) {
            Classification::Link { bucket, url } => collector.add(bucket, url),
            Classification::Skip { reason } => {
                skipped.entry(href.to_string()).or_insert(reason);
            }
        }
    };

    // Anchors
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                classify(href, &mut collector);
            }
        }
    }

    // Images: src plus the first srcset candidate
    if let Ok(selector) = Selector::parse("img") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                classify(src, &mut collector);
            }
            if let Some(srcset) = element.value().attr("srcset") {
                if let Some(first) = first_srcset_url(srcset) {
                    classify(first, &mut collector);
                }
            }
        }
    }

    // Video elements and their sources
    for tag in ["video[src]", "source[src]"] {
        if let Ok(selector) = Selector::parse(tag) {
            for element in document.select(&selector) {
                if let Some(src) = element.value().attr("src") {
                    classify(src, &mut collector);
                }
            }
        }
    }

    ExtractedLinks {
        internal: collector.internal,
        external: if options.include_external {
            Some(collector.external)
        } else {
            None
        },
        media: if options.include_media {
            Some(MediaLinks {
                images: collector.images,
                videos: collector.videos,
                documents: collector.documents,
            })
        } else {
            None
        },
    }
}

/// Returns the URL portion of the first candidate in a srcset attribute
fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .map(|candidate| candidate.trim())
        .and_then(|candidate| candidate.split_whitespace().next())
        .filter(|s| !s.is_empty())
}
