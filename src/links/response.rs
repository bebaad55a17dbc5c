use crate::extract::{ExtractedLinks, PageMetadata};
use crate::scrape::MetaFiles;
use crate::tree::{SkippedBuckets, Tree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timing metrics attached when the request asks for them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetrics {
    /// Human-readable duration, e.g. "840ms" or "2.31s"
    pub readable_duration: String,
    pub duration_ms: u64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

impl RequestMetrics {
    /// Computes metrics from the request start to now
    pub fn since(started: DateTime<Utc>) -> Self {
        let ended = Utc::now();
        let duration_ms = (ended - started).num_milliseconds().max(0) as u64;

        let readable_duration = if duration_ms < 1000 {
            format!("{}ms", duration_ms)
        } else {
            format!("{:.2}s", duration_ms as f64 / 1000.0)
        };

        Self {
            readable_duration,
            duration_ms,
            start_time_ms: started.timestamp_millis(),
            end_time_ms: ended.timestamp_millis(),
        }
    }
}

/// Successful links response
///
/// Tree mode carries `tree`; non-tree mode carries the content fields at
/// the response root instead. The two shapes share this struct; absent
/// fields are omitted from the wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksSuccessResponse {
    pub request_id: Uuid,
    pub success: bool,
    pub cached: bool,
    pub target_url: String,
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestors: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<Tree>,

    /// Whether the tree was primarily reused from cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_fresh: Option<bool>,

    // Non-tree content fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    #[serde(rename = "cleanedHTML", skip_serializing_if = "Option::is_none")]
    pub cleaned_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_links: Option<ExtractedLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_files: Option<MetaFiles>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RequestMetrics>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_urls: Option<SkippedBuckets>,
}

/// Error response
///
/// Carries the cached tree when one existed, so callers degrade
/// gracefully on target failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksErrorResponse {
    pub request_id: Uuid,
    pub success: bool,
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<Tree>,
}

/// The response union, discriminated by `success`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinksResponse {
    Error(LinksErrorResponse),
    Success(LinksSuccessResponse),
}

impl LinksResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Builds an error response
    pub fn error(request_id: Uuid, target_url: &str, error: String, tree: Option<Tree>) -> Self {
        Self::Error(LinksErrorResponse {
            request_id,
            success: false,
            target_url: target_url.to_string(),
            timestamp: Utc::now(),
            error,
            tree,
        })
    }
}
