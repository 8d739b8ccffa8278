//! Storage layer: the two-tier schedule cache.

mod cache;

pub use cache::{CacheStore, sanitize_file_name};
