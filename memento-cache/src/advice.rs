//! Caching around-advice.
//!
//! [`CachingAdvice`] memoizes an intercepted operation: it derives a key from
//! the join point's arguments, returns the stored value on a hit, and on a
//! miss runs the operation once and stores what it returned.
//!
//! The result is stored as soon as `proceed` returns. When the operation
//! returns a pending handle (for example a `futures::future::Shared`), the
//! handle itself is cached, so calls that arrive before it settles share the
//! one in-flight operation. A handle that later fails stays cached until the
//! store is cleared.

use std::fmt;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, trace, warn};

use memento_core::error::{AdviceError, Result};
use memento_core::invocation::Invocation;
use memento_core::traits::{Advice, CacheStore, JoinPoint, KeyGenerator};

use crate::config::AdviceConfig;
use crate::keys::JsonKeyGenerator;

/// Memoizing around-advice over an injected store.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use memento_cache::{CachingAdvice, MemoryStore};
/// use memento_core::{Advice, Invocation};
///
/// let store = Arc::new(MemoryStore::new());
/// let advice = CachingAdvice::new(Arc::clone(&store));
///
/// let add = |(a, b): (i32, i32)| Ok::<_, String>(a + b);
/// assert_eq!(advice.around(Invocation::new((1, 2), add)).unwrap(), 3);
/// assert_eq!(store.keys(), vec!["[1,2]".to_string()]);
/// ```
pub struct CachingAdvice<S: ?Sized, G = JsonKeyGenerator> {
    store: Arc<S>,
    key_generator: G,
    config: AdviceConfig,
    call_lock: Option<ReentrantMutex<()>>,
}

impl<S: ?Sized> CachingAdvice<S> {
    /// Creates advice that keys calls with [`JsonKeyGenerator`].
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, AdviceConfig::default())
    }

    /// Creates advice with custom configuration.
    pub fn with_config(store: Arc<S>, config: AdviceConfig) -> Self {
        let call_lock = config.serialize_calls.then(|| ReentrantMutex::new(()));
        Self {
            store,
            key_generator: JsonKeyGenerator,
            config,
            call_lock,
        }
    }
}

impl<S: ?Sized, G> CachingAdvice<S, G> {
    /// Replaces the key generator.
    pub fn with_key_generator<K>(self, key_generator: K) -> CachingAdvice<S, K> {
        CachingAdvice {
            store: self.store,
            key_generator,
            config: self.config,
            call_lock: self.call_lock,
        }
    }

    /// Returns the store this advice consults.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AdviceConfig {
        &self.config
    }

    /// Returns the store key used for `args`, prefix included.
    pub fn key_for<A>(&self, args: &A) -> Result<String>
    where
        A: ?Sized,
        G: KeyGenerator<A>,
    {
        let key = self.key_generator.generate(args)?;
        Ok(self.config.scoped_key(key))
    }

    /// Wraps `target` so every call goes through this advice.
    pub fn memoize<F>(self, target: F) -> Memoized<F, S, G> {
        Memoized { advice: self, target }
    }
}

impl<J, S, G> Advice<J> for CachingAdvice<S, G>
where
    J: JoinPoint,
    J::Output: Clone,
    S: CacheStore<J::Output> + ?Sized,
    G: KeyGenerator<J::Args>,
{
    fn around(&self, join_point: J) -> std::result::Result<J::Output, AdviceError<J::Error>> {
        let key = self.key_for(join_point.args())?;

        // Re-entrant so a memoized operation may call itself on this thread.
        let _guard = self.call_lock.as_ref().map(|lock| lock.lock());

        if self.store.has(&key) {
            if let Some(value) = self.store.get(&key) {
                trace!(key = %key, "Cache hit");
                return Ok(value);
            }
            warn!(key = %key, "Store reported key present but returned no value");
        }

        debug!(key = %key, "Cache miss, proceeding");

        let value = match join_point.proceed() {
            Ok(value) => value,
            Err(e) => {
                debug!(key = %key, "Advised operation failed, nothing stored");
                return Err(AdviceError::Operation(e));
            }
        };

        self.store.set(key, value.clone());
        Ok(value)
    }
}

impl<S: ?Sized, G: fmt::Debug> fmt::Debug for CachingAdvice<S, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingAdvice")
            .field("key_generator", &self.key_generator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An operation whose every call is routed through [`CachingAdvice`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use memento_cache::{CachingAdvice, MemoryStore};
///
/// let square = CachingAdvice::new(Arc::new(MemoryStore::new()))
///     .memoize(|n: u64| Ok::<_, String>(n * n));
///
/// assert_eq!(square.call(12).unwrap(), 144);
/// assert_eq!(square.call(12).unwrap(), 144);
/// ```
pub struct Memoized<F, S: ?Sized, G = JsonKeyGenerator> {
    advice: CachingAdvice<S, G>,
    target: F,
}

impl<F, S: ?Sized, G> Memoized<F, S, G> {
    /// Calls the operation with `args`, or returns the stored result.
    pub fn call<A, T, E>(&self, args: A) -> std::result::Result<T, AdviceError<E>>
    where
        F: Fn(A) -> std::result::Result<T, E>,
        T: Clone,
        S: CacheStore<T>,
        G: KeyGenerator<A>,
    {
        self.advice.around(Invocation::new(args, &self.target))
    }

    /// Returns the advice wrapping the operation.
    pub fn advice(&self) -> &CachingAdvice<S, G> {
        &self.advice
    }
}

impl<F, S: ?Sized, G: fmt::Debug> fmt::Debug for Memoized<F, S, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("advice", &self.advice)
            .finish_non_exhaustive()
    }
}
