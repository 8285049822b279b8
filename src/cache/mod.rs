//! Response caching module
//!
//! Content-addressed, TTL-bounded caching of transformed responses.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKeyGenerator`] | Deterministic, secret-free key derivation |
//! | [`FileCacheStore`] | File-backed store with TTL, sweep and size eviction |
//! | [`CacheConfig`] | Size ceiling and sweep interval |
//! | [`EntryMetadata`] | Per-entry inspection metadata |
//!
//! The store is addressed purely by content-derived keys and writes for
//! the same key are idempotent given identical inputs, so concurrent
//! external processes may interleave reads and writes without locking.

mod key;
mod store;

pub use key::{CacheKey, CacheKeyGenerator, HEADER_ALLOWLIST};
pub use store::{CacheConfig, CacheEntryInfo, CacheStats, EntryMetadata, FileCacheStore};
