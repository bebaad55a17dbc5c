//! Scraping module
//!
//! This module contains the fetch seam and per-request scrape
//! coordination:
//! - The [`Fetcher`] trait and its reqwest-backed default
//! - Manual redirect handling and error classification
//! - Per-request memoization, visit stamping, and skip bookkeeping

mod coordinator;
mod fetcher;

pub use coordinator::{MetaFiles, ScrapeCoordinator, ScrapeOptions, ScrapedData};
pub use fetcher::{
    build_http_client, sanitize_headers, FetchMethod, FetchOptions, FetchOutcome, FetchedPage,
    Fetcher, HttpFetcher, RedirectMode,
};
