//! Cache layer
//!
//! Key-value cache with two keying schemes (tree and non-tree) sharing a
//! single namespace. Backends: an in-memory TTL map and a SQLite table.
//! Reads are advisory and writes are fire-and-forget with one retry.

mod key;
mod memory;
mod sqlite;
mod store;

pub use key::{non_tree_key, tree_key};
pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use store::{
    spawn_put_with_retry, CacheEntry, CacheError, CacheResult, CacheStore, SideMetadata,
};
