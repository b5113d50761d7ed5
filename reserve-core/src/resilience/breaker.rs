//! Per-dependency circuit breakers and the registry that owns them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{CallError, ConfigError};

/// Failures tolerated before a circuit opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Time an open circuit waits before admitting a probe.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Observable state of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CircuitState {
    /// Calls pass through.
    #[default]
    Closed,
    /// Calls are rejected until the cooldown elapses.
    Open,
    /// A probe call is in flight after the cooldown.
    HalfOpen,
}

impl CircuitState {
    /// Return the state as a `snake_case` `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning for a [`CircuitBreaker`].
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use reserve_core::BreakerConfig;
///
/// let config = BreakerConfig::new(2, Duration::from_secs(1))?.with_enabled(true);
/// assert_eq!(config.failure_threshold(), 2);
/// assert!(BreakerConfig::new(0, Duration::from_secs(1)).is_err());
/// # Ok::<(), reserve_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    failure_threshold: u32,
    cooldown: Duration,
    enabled: bool,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
            enabled: true,
        }
    }
}

impl BreakerConfig {
    /// Open after `failure_threshold` consecutive failures and stay open for
    /// `cooldown`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FailureThreshold`] when the threshold is zero.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Result<Self, ConfigError> {
        if failure_threshold == 0 {
            return Err(ConfigError::FailureThreshold);
        }
        Ok(Self {
            failure_threshold,
            cooldown,
            enabled: true,
        })
    }

    /// Disable the breaker so every call passes through.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Consecutive failures that open the circuit.
    #[must_use]
    pub const fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Time spent open before a probe is admitted.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether the breaker gates calls at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Call counters kept by a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakerStats {
    /// Calls offered to the breaker.
    pub total_calls: u64,
    /// Calls that ran and succeeded.
    pub successful_calls: u64,
    /// Calls that ran and failed.
    pub failed_calls: u64,
    /// Calls rejected while open.
    pub rejected_calls: u64,
    /// Transitions into the open state.
    pub times_opened: u64,
}

#[derive(Debug, Default)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    stats: BreakerStats,
}

/// Failure gate for one named dependency.
///
/// The lock is only held to read or update the state; the guarded operation
/// itself runs unlocked. Concurrent calls arriving after the cooldown may
/// each be admitted as a probe.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use reserve_core::{BreakerConfig, CallError, CircuitBreaker, CircuitState};
///
/// let config = BreakerConfig::new(1, Duration::from_secs(60))?;
/// let breaker = CircuitBreaker::new("primary-routing", config);
///
/// let failed: Result<(), _> = breaker.call(|| Err::<(), _>("timeout"));
/// assert!(matches!(failed, Err(CallError::Failed("timeout"))));
/// assert_eq!(breaker.state(), CircuitState::Open);
///
/// let rejected = breaker.call(|| Ok::<_, &str>(()));
/// assert!(rejected.is_err_and(|err| err.is_circuit_open()));
/// # Ok::<(), reserve_core::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::default()),
        }
    }

    /// Dependency name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration the breaker was built with.
    #[must_use]
    pub const fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Run `op` unless the circuit is open.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::CircuitOpen`] without invoking `op` while the
    /// circuit is open, or [`CallError::Failed`] with the error `op` returned.
    pub fn call<T, E, F>(&self, op: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if !self.try_acquire() {
            return Err(CallError::CircuitOpen {
                dependency: self.name.clone(),
            });
        }
        match op() {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(CallError::Failed(err))
            }
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Failures recorded since the last reset or success.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Whether calls are currently being rejected.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Whether calls currently pass through freely.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn stats(&self) -> BreakerStats {
        self.lock().stats
    }

    /// Force the circuit closed and clear the failure count.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
        log::info!("circuit for {} reset", self.name);
    }

    fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        inner.stats.total_calls += 1;
        if !self.config.enabled || inner.state != CircuitState::Open {
            return true;
        }
        let cooled = inner
            .opened_at
            .is_none_or(|at| at.elapsed() >= self.config.cooldown);
        if cooled {
            inner.state = CircuitState::HalfOpen;
            log::info!("circuit for {} half-open; admitting probe", self.name);
            return true;
        }
        inner.stats.rejected_calls += 1;
        log::warn!("circuit for {} is open; rejecting call", self.name);
        false
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        inner.stats.successful_calls += 1;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.opened_at = None;
                log::info!("circuit for {} closed after successful probe", self.name);
            }
            CircuitState::Closed => {
                if inner.failure_count != 0 {
                    inner.failure_count = 0;
                }
            }
            // A call admitted before the circuit opened finished late.
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        inner.stats.failed_calls += 1;
        if !self.config.enabled {
            return;
        }
        inner.failure_count = inner.failure_count.saturating_add(1);
        let should_open = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.failure_count >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if should_open {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.stats.times_opened += 1;
            log::warn!(
                "circuit for {} opened after {} failures; cooling down for {:?}",
                self.name,
                inner.failure_count,
                self.config.cooldown
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point-in-time view of one registered breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Dependency name.
    pub name: String,
    /// Circuit state.
    pub state: CircuitState,
    /// Failures since the last reset or success.
    pub failure_count: u32,
    /// Call counters.
    pub stats: BreakerStats,
}

/// Process-wide set of breakers keyed by dependency name.
///
/// Breakers are created lazily on first use and live as long as the
/// registry. Share one registry between every client that talks to the
/// same dependencies.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use reserve_core::{BreakerConfig, BreakerRegistry};
///
/// let registry = BreakerRegistry::default()
///     .with_override("primary-traffic", BreakerConfig::new(2, Duration::from_secs(5))?);
/// let a = registry.breaker("primary-traffic");
/// let b = registry.breaker("primary-traffic");
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.config().failure_threshold(), 2);
/// # Ok::<(), reserve_core::ConfigError>(())
/// ```
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    defaults: BreakerConfig,
    overrides: HashMap<String, BreakerConfig>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Create an empty registry using `defaults` for every dependency.
    #[must_use]
    pub fn new(defaults: BreakerConfig) -> Self {
        Self {
            defaults,
            overrides: HashMap::new(),
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Use `config` instead of the defaults for `name`.
    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, config: BreakerConfig) -> Self {
        self.overrides.insert(name.into(), config);
        self
    }

    /// Return the breaker for `name`, creating it on first use.
    #[must_use]
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.lock();
        if let Some(existing) = breakers.get(name) {
            return Arc::clone(existing);
        }
        let config = self.overrides.get(name).copied().unwrap_or(self.defaults);
        let breaker = Arc::new(CircuitBreaker::new(name, config));
        breakers.insert(name.to_owned(), Arc::clone(&breaker));
        breaker
    }

    /// Return the breaker for `name` if it has been used.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.lock().get(name).cloned()
    }

    /// Close the breaker for `name`. Returns `false` if it was never used.
    pub fn reset(&self, name: &str) -> bool {
        self.get(name).is_some_and(|breaker| {
            breaker.reset();
            true
        })
    }

    /// Describe every registered breaker, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<_> = self.lock().values().cloned().collect();
        let mut snapshots: Vec<_> = breakers
            .iter()
            .map(|breaker| BreakerSnapshot {
                name: breaker.name().to_owned(),
                state: breaker.state(),
                failure_count: breaker.failure_count(),
                stats: breaker.stats(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<CircuitBreaker>>> {
        self.breakers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::cell::Cell;
    use std::thread;

    const COOLDOWN: Duration = Duration::from_millis(50);

    #[fixture]
    fn breaker() -> CircuitBreaker {
        let config = BreakerConfig::new(2, COOLDOWN).expect("valid config");
        CircuitBreaker::new("primary-routing", config)
    }

    fn fail(breaker: &CircuitBreaker) {
        let _ = breaker.call(|| Err::<(), _>("boom"));
    }

    #[rstest]
    fn opens_at_threshold(breaker: CircuitBreaker) {
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.stats().times_opened, 1);
    }

    #[rstest]
    fn open_circuit_does_not_invoke_operation(breaker: CircuitBreaker) {
        fail(&breaker);
        fail(&breaker);
        let invoked = Cell::new(false);
        let result = breaker.call(|| {
            invoked.set(true);
            Ok::<_, &str>(())
        });
        assert!(matches!(
            result,
            Err(CallError::CircuitOpen { ref dependency }) if dependency == "primary-routing"
        ));
        assert!(!invoked.get());
        assert_eq!(breaker.stats().rejected_calls, 1);
    }

    #[rstest]
    fn successful_probe_closes_circuit(breaker: CircuitBreaker) {
        fail(&breaker);
        fail(&breaker);
        thread::sleep(COOLDOWN + Duration::from_millis(10));

        let result = breaker.call(|| Ok::<_, &str>(7));
        assert_eq!(result.ok(), Some(7));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[rstest]
    fn failed_probe_restarts_cooldown(breaker: CircuitBreaker) {
        fail(&breaker);
        fail(&breaker);
        thread::sleep(COOLDOWN + Duration::from_millis(10));

        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.stats().times_opened, 2);
        let rejected = breaker.call(|| Ok::<_, &str>(()));
        assert!(rejected.is_err_and(|err| err.is_circuit_open()));
    }

    #[rstest]
    fn success_resets_failure_count(breaker: CircuitBreaker) {
        fail(&breaker);
        assert_eq!(breaker.failure_count(), 1);
        let _ = breaker.call(|| Ok::<_, &str>(()));
        assert_eq!(breaker.failure_count(), 0);
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[rstest]
    fn disabled_breaker_never_opens() {
        let config = BreakerConfig::new(1, COOLDOWN)
            .expect("valid")
            .with_enabled(false);
        let breaker = CircuitBreaker::new("off", config);
        for _ in 0..5 {
            fail(&breaker);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        let stats = breaker.stats();
        assert_eq!(stats.failed_calls, 5);
        assert_eq!(stats.rejected_calls, 0);
    }

    #[rstest]
    fn counts_calls(breaker: CircuitBreaker) {
        let _ = breaker.call(|| Ok::<_, &str>(()));
        fail(&breaker);
        let stats = breaker.stats();
        assert_eq!(stats.total_calls, 2);
        assert_eq!(stats.successful_calls, 1);
        assert_eq!(stats.failed_calls, 1);
    }

    #[rstest]
    fn registry_applies_overrides_and_resets() {
        let strict = BreakerConfig::new(1, Duration::from_secs(60)).expect("valid");
        let registry = BreakerRegistry::default().with_override("primary-search", strict);

        let search = registry.breaker("primary-search");
        let routing = registry.breaker("primary-routing");
        assert_eq!(search.config().failure_threshold(), 1);
        assert_eq!(
            routing.config().failure_threshold(),
            DEFAULT_FAILURE_THRESHOLD
        );

        fail(&search);
        assert!(search.is_open());
        assert!(routing.is_closed(), "dependencies are isolated");
        assert!(registry.reset("primary-search"));
        assert!(search.is_closed());
        assert!(!registry.reset("never-used"));
    }

    #[rstest]
    fn snapshot_is_sorted_by_name() {
        let registry = BreakerRegistry::default();
        let _ = registry.breaker("secondary-routing");
        let _ = registry.breaker("primary-routing");
        let names: Vec<_> = registry.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["primary-routing", "secondary-routing"]);
    }
}
