//! Common traits for memento.
//!
//! These are the seams between the advice and its collaborators: the store it
//! consults, the key generator it derives lookups with, the join point the
//! interception layer hands it, and the advice itself.

use crate::error::{AdviceError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Key-value store consulted by caching advice.
///
/// Implementations might be:
/// - An in-memory map (for tests and single-process use)
/// - A sharded concurrent map
/// - A client for a remote store
///
/// Each operation must be safe to call from several threads. No atomicity
/// across `has` and `set` is expected.
pub trait CacheStore<V>: Send + Sync {
    /// Returns true if a value is associated with `key`.
    fn has(&self, key: &str) -> bool;

    /// Returns the value last passed to [`set`](Self::set) for `key`.
    fn get(&self, key: &str) -> Option<V>;

    /// Associates `value` with `key`, replacing any previous value.
    fn set(&self, key: String, value: V);
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY GENERATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives a cache key from an invocation's arguments.
///
/// Must be pure: structurally equal arguments always produce equal keys for
/// the lifetime of the generator.
pub trait KeyGenerator<A: ?Sized>: Send + Sync {
    /// Produces the key for `args`.
    fn generate(&self, args: &A) -> Result<String>;
}

impl<A, F> KeyGenerator<A> for F
where
    A: ?Sized,
    F: Fn(&A) -> Result<String> + Send + Sync,
{
    fn generate(&self, args: &A) -> Result<String> {
        self(args)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JOIN POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// One intercepted call.
///
/// Built fresh for every invocation by whatever performs the interception.
/// `proceed` consumes the join point, so the original operation runs at most
/// once per join point.
pub trait JoinPoint {
    /// The invocation's arguments.
    type Args: ?Sized;
    /// What the original operation returns on success.
    type Output;
    /// What the original operation returns on failure.
    type Error;

    /// Returns the invocation's arguments.
    fn args(&self) -> &Self::Args;

    /// Runs the original operation.
    fn proceed(self) -> std::result::Result<Self::Output, Self::Error>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Around-advice: full control over whether the original operation runs.
pub trait Advice<J: JoinPoint> {
    /// Handles one intercepted call.
    fn around(&self, join_point: J) -> std::result::Result<J::Output, AdviceError<J::Error>>;
}
