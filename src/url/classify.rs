use crate::url::kin::path_segments;
use crate::url::normalize::normalize_url;
use url::Url;

/// Image file extensions routed to the media.images bucket
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico"];

/// Video file extensions routed to the media.videos bucket
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi"];

/// Document file extensions routed to the media.documents bucket
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "csv",
];

/// The bucket a classified link lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkBucket {
    /// Same-root link, eligible for the tree
    Internal,
    /// Link to a different root
    External,
    /// Image asset
    Image,
    /// Video asset
    Video,
    /// Downloadable document
    Document,
}

/// Result of classifying a single href
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The href resolved and classified into a bucket
    Link { bucket: LinkBucket, url: Url },
    /// The href was rejected; the reason is recorded per request
    Skip { reason: String },
}

/// Classifies an href found on a page
///
/// Resolution and rejection rules:
///
/// - The href is resolved against `base` and normalized
/// - Empty hrefs, fragment-only hrefs, and `javascript:` / `mailto:` /
///   `tel:` / `data:` schemes are skipped
/// - Anything that fails to resolve to an http(s) URL is skipped
///
/// Bucket rules, in order:
///
/// 1. A recognized media extension wins regardless of host
/// 2. Same root as `root` (exact host or a subdomain of it) is internal;
///    in platform mode the link must additionally extend the root's path
/// 3. Everything else is external
///
/// This function is total over well-formed hrefs: it never panics and
/// never returns an error, only `Classification::Skip`.
///
/// # Arguments
///
/// * `href` - The raw attribute value from the page
/// * `base` - The URL of the page the href was found on
/// * `root` - The crawl root URL for this request
/// * `platform_mode` - Whether platform classification applies
pub fn classify_link(href: &str, base: &Url, root: &Url, platform_mode: bool) -> Classification {
    let href = href.trim();

    if href.is_empty() {
        return Classification::Skip {
            reason: "Empty href".to_string(),
        };
    }

    if href.starts_with('#') {
        return Classification::Skip {
            reason: "Fragment-only link".to_string(),
        };
    }

    for scheme in ["javascript:", "mailto:", "tel:", "data:"] {
        if href.to_ascii_lowercase().starts_with(scheme) {
            return Classification::Skip {
                reason: format!("Unsupported scheme: {}", scheme.trim_end_matches(':')),
            };
        }
    }

    let resolved = match base.join(href) {
        Ok(resolved) => resolved,
        Err(e) => {
            return Classification::Skip {
                reason: format!("Failed to resolve: {}", e),
            };
        }
    };

    let normalized = match normalize_url(resolved.as_str()) {
        Ok(normalized) => normalized,
        Err(e) => {
            return Classification::Skip {
                reason: format!("Failed to normalize: {}", e),
            };
        }
    };

    // Media extension wins regardless of host
    if let Some(bucket) = media_bucket(&normalized) {
        return Classification::Link {
            bucket,
            url: normalized,
        };
    }

    if is_same_root(&normalized, root) {
        if platform_mode && !extends_root_path(&normalized, root) {
            // Platform mode narrows internal to the root's own subtree
            return Classification::Link {
                bucket: LinkBucket::External,
                url: normalized,
            };
        }
        return Classification::Link {
            bucket: LinkBucket::Internal,
            url: normalized,
        };
    }

    Classification::Link {
        bucket: LinkBucket::External,
        url: normalized,
    }
}

/// Returns the media bucket for a URL based on its path extension
pub fn media_bucket(url: &Url) -> Option<LinkBucket> {
    let extension = url.path().rsplit('.').next()?.to_ascii_lowercase();

    // A path without a dot yields the whole path here; rule it out
    if !url.path().contains('.') {
        return None;
    }

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Some(LinkBucket::Image)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Some(LinkBucket::Video)
    } else if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
        Some(LinkBucket::Document)
    } else {
        None
    }
}

/// Checks whether a URL shares the crawl root: exact host match or a
/// subdomain of the root's host
pub fn is_same_root(url: &Url, root: &Url) -> bool {
    match (url.host_str(), root.host_str()) {
        (Some(host), Some(root_host)) => {
            host == root_host || host.ends_with(&format!(".{}", root_host))
        }
        _ => false,
    }
}

/// Checks whether a URL's path extends (or equals) the root's path
fn extends_root_path(url: &Url, root: &Url) -> bool {
    if url.host_str() != root.host_str() {
        return false;
    }

    let root_segments = path_segments(root);
    let url_segments = path_segments(url);

    url_segments.len() >= root_segments.len()
        && url_segments[..root_segments.len()] == root_segments[..]
}
