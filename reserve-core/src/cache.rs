//! Size-bounded cache with per-entry expiry and least-recently-used eviction.
//!
//! Each [`TtlCache`] owns its entries behind its own mutex, so separate caches
//! never contend. Expired entries are purged lazily when read; the
//! least-recently-touched entry is evicted eagerly when an insert pushes the
//! cache past its bound. Both `get` and `set` count as a touch.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::ConfigError;

/// Default number of entries held by a cache.
pub const DEFAULT_CACHE_SIZE: usize = 512;

/// Construction parameters for a [`TtlCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    name: String,
    max_size: NonZeroUsize,
    default_ttl: Duration,
}

impl CacheConfig {
    /// Describe a cache holding at most `max_size` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CacheSize`] when `max_size` is zero.
    pub fn new(
        name: impl Into<String>,
        max_size: usize,
        default_ttl: Duration,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let max_size = NonZeroUsize::new(max_size).ok_or_else(|| ConfigError::CacheSize {
            name: name.clone(),
        })?;
        Ok(Self {
            name,
            max_size,
            default_ttl,
        })
    }

    /// Cache name used in log messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn max_size(&self) -> NonZeroUsize {
        self.max_size
    }

    /// Lifetime applied by [`TtlCache::put`].
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Counters describing how a cache has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries dropped to respect the size bound.
    pub evictions: u64,
    /// Entries dropped because their lifetime had elapsed.
    pub expirations: u64,
    /// Entries currently held.
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups that were hits; `0.0` before the first lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            // Counter values stay far below f64's exact integer range.
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    // `None` when the lifetime overflows `Instant`; such entries never expire.
    expires_at: Option<Instant>,
    touched: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    recency: BTreeMap<u64, K>,
    tick: u64,
    stats: CacheStats,
}

impl<K, V> CacheState<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn bump(&mut self, previous: u64) -> u64 {
        let tick = self.next_tick();
        if let Some(key) = self.recency.remove(&previous) {
            self.recency.insert(tick, key);
        }
        tick
    }
}

/// Thread-safe expiring cache.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use reserve_core::{CacheConfig, TtlCache};
///
/// let config = CacheConfig::new("routes", 2, Duration::from_secs(60))?;
/// let cache = TtlCache::new(config);
/// cache.put("a", 1);
/// cache.put("b", 2);
/// assert_eq!(cache.get(&"a"), Some(1));
/// cache.put("c", 3); // evicts "b", the least recently touched
/// assert_eq!(cache.get(&"b"), None);
/// assert_eq!(cache.stats().evictions, 1);
/// # Ok::<(), reserve_core::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct TtlCache<K, V> {
    name: String,
    max_size: NonZeroUsize,
    default_ttl: Duration,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            name: config.name,
            max_size: config.max_size,
            default_ttl: config.default_ttl,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Cache name used in log messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return a clone of the live value for `key`.
    ///
    /// An expired entry is removed and reported as a miss. A hit refreshes
    /// the entry's recency but not its lifetime.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.lock();
        let now = Instant::now();
        let (touched, expired) = match state.entries.get(key) {
            Some(entry) => (entry.touched, entry.is_expired(now)),
            None => {
                state.stats.misses += 1;
                return None;
            }
        };
        if expired {
            state.entries.remove(key);
            state.recency.remove(&touched);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            return None;
        }
        let tick = state.bump(touched);
        state.stats.hits += 1;
        let entry = state.entries.get_mut(key)?;
        entry.touched = tick;
        Some(entry.value.clone())
    }

    /// Insert or overwrite `key` with an explicit lifetime.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        let mut state = self.lock();
        let tick = state.next_tick();
        let entry = CacheEntry {
            value,
            expires_at,
            touched: tick,
        };
        if let Some(previous) = state.entries.insert(key.clone(), entry) {
            state.recency.remove(&previous.touched);
        }
        state.recency.insert(tick, key);

        let mut evicted = 0_u64;
        while state.entries.len() > self.max_size.get() {
            let Some((_, oldest)) = state.recency.pop_first() else {
                break;
            };
            state.entries.remove(&oldest);
            evicted += 1;
        }
        if evicted > 0 {
            state.stats.evictions += evicted;
            log::debug!("cache {} evicted {evicted} entries", self.name);
        }
    }

    /// Insert or overwrite `key` with the default lifetime.
    pub fn put(&self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Number of entries held, including ones that expired but were not read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.recency.clear();
    }

    /// Snapshot of the usage counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            size: state.entries.len(),
            ..state.stats
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K, V>> {
        // A panic while holding the lock cannot leave the maps inconsistent
        // with each other for longer than one operation.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
