//! Content extraction module
//!
//! This module turns raw HTML into structured data: classified link
//! buckets, page metadata, and cleaned HTML.

mod cleaner;
mod links;
mod metadata;

pub use cleaner::{clean_html, CleaningProcessor};
pub use links::{extract_links_from_html, ExtractedLinks, LinkExtractionOptions, MediaLinks};
pub use metadata::{extract_metadata, PageMetadata};
