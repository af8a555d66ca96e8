//! Local caching for directory data.
//!
//! - `CacheManager`: JSON files on disk, one per key, so data survives
//!   restarts
//! - `MemoryCache`: keyed entries with a max-age check and
//!   stale-while-revalidate reads, optionally writing through to disk
//!
//! Cached entries carry their `cached_at` time; freshness is decided per
//! read by the caller's `CachePolicy`.

pub mod manager;
pub mod memory;

pub use manager::{CacheManager, CachedData};
pub use memory::{CachePolicy, Fetched, Freshness, MemoryCache};
