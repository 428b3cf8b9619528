//! Disk backed response cache for the micro forward proxy.
//!
//! Responses are stored one file per key, named by the 128-bit digest of the
//! request fingerprint, and served until their TTL runs out. A miss is filled
//! by a caller supplied [`Resolver`]; concurrent misses for the same key wait
//! for a single fill instead of all going to the origin.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use micro_proxy_cache::{Cache, CacheConfig, CacheError, EntryRef, make_resolver};
//!
//! # async fn run() -> Result<(), CacheError> {
//! let cache = Arc::new(Cache::new(CacheConfig::new("cache", Duration::from_secs(60)))?);
//!
//! let resolver = {
//!     let cache = Arc::clone(&cache);
//!     make_resolver(move |entry: EntryRef| {
//!         let cache = Arc::clone(&cache);
//!         async move { cache.set(&entry, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await }
//!     })
//! };
//!
//! let _response = cache.get("a.example/index.html", &resolver).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Entry lifecycle
//!
//! `Invalid` -> `InProgress` (one caller claims it and runs the resolver) ->
//! `Ok` (file written, timestamp taken) -> `Invalid` again once a lookup finds
//! it older than the TTL. A failed or cancelled fill goes straight back to
//! `Invalid`. Files are only deleted by the next claimer or by
//! [`Cache::shutdown`], never while anyone reads them.

mod cache;
mod entry;
mod error;
mod key;
mod resolver;

pub use cache::Cache;
pub use cache::CacheConfig;
pub use cache::DEFAULT_BUCKETS;
pub use entry::EntryRef;
pub use entry::EntryStatus;
pub use error::CacheError;
pub use key::CacheKey;
pub use resolver::make_resolver;
pub use resolver::Resolver;
pub use resolver::ResolverFn;
