//! Caching around-advice for memento.
//!
//! Memoizes an intercepted operation over a pluggable [`CacheStore`]. The
//! bundled stores never evict or expire entries.
//!
//! [`CacheStore`]: memento_core::traits::CacheStore

mod advice;
mod config;
mod keys;
mod store;

pub use advice::{CachingAdvice, Memoized};
pub use config::AdviceConfig;
pub use keys::{HashedKeyGenerator, JsonKeyGenerator};
pub use store::{ConcurrentStore, MemoryStore, StoreStats};
