//! Circuit breaking and retries for calls to unreliable dependencies.

mod breaker;
mod retry;

pub use breaker::{
    BreakerConfig, BreakerRegistry, BreakerSnapshot, BreakerStats, CircuitBreaker, CircuitState,
    DEFAULT_COOLDOWN, DEFAULT_FAILURE_THRESHOLD,
};
pub use retry::{DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES, RetryExecutor, RetryPolicy};
