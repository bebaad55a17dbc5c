//! URL handling module for linkarbor
//!
//! This module provides URL normalization, root derivation, kin (ancestor
//! and descendant) enumeration, and link classification.

mod classify;
mod kin;
mod normalize;
mod root;

// Re-export main functions
pub use classify::{classify_link, is_same_root, media_bucket, Classification, LinkBucket};
pub use kin::{
    ancestor_paths, compare_kin, descendant_paths, is_path_descendant, path_depth, path_segments,
};
pub use normalize::normalize_url;
pub use root::{base_domain, derive_root_url, is_platform_url, origin_of};
