//! Cache and breaker discipline shared by the provider clients.

use std::hash::Hash;
use std::sync::Arc;

use reserve_core::{
    BreakerRegistry, CallError, CircuitBreaker, ProviderError, RetryExecutor, RetryPolicy,
    TtlCache,
};

/// Retrying, breaker-gated access to one upstream dependency.
#[derive(Debug)]
pub(crate) struct Guarded {
    breaker: Arc<CircuitBreaker>,
    executor: RetryExecutor,
}

impl Guarded {
    pub(crate) fn new(registry: &BreakerRegistry, dependency: &str, policy: RetryPolicy) -> Self {
        Self {
            breaker: registry.breaker(dependency),
            executor: RetryExecutor::new(policy),
        }
    }

    /// Run a transport call, collapsing every failure to `None`.
    ///
    /// `op` must only report transport failures; those are retried and count
    /// against the breaker.
    pub(crate) fn fetch<T>(&self, op: impl FnMut() -> Result<T, ProviderError>) -> Option<T> {
        match self.executor.run(&self.breaker, op) {
            Ok(value) => Some(value),
            Err(CallError::CircuitOpen { dependency }) => {
                log::warn!("skipping {dependency}: circuit open");
                None
            }
            Err(CallError::Failed(err)) => {
                log::warn!("{} gave up: {err}", self.breaker.name());
                None
            }
        }
    }
}

/// Serve `key` from `cache`, loading and storing it on a miss.
///
/// Only values produced by `load` are stored; a `None` is never cached.
pub(crate) fn cached<K, V>(cache: &TtlCache<K, V>, key: K, load: impl FnOnce() -> Option<V>) -> Option<V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if let Some(hit) = cache.get(&key) {
        log::debug!("cache {} hit", cache.name());
        return Some(hit);
    }
    let value = load()?;
    cache.put(key, value.clone());
    Some(value)
}
