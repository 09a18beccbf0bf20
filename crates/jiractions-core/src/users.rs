//! User identity resolution with a process-lifetime memoizing cache.
//!
//! The engine sees bare account keys in changelog deltas and custom-field
//! payloads. Resolving a key to a display identity goes through an external
//! [`UserResolver`] exactly once per key; results (including fallbacks) are
//! cached for the life of the service.
//!
//! A lookup never fails the caller: when the resolver errors, the identity
//! degrades to the raw key and the miss is counted and logged.
//!
//! The cache mutex is held across resolution. That is deliberately coarse:
//! sequential callers pay nothing, and callers that parallelize across
//! issues get single-flight behavior for free (no duplicate resolver calls
//! for a contended key).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

/// A resolved display identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable account key.
    pub key: String,
    /// Display name; equals the key for unresolved users.
    pub display_name: String,
}

impl UserIdentity {
    /// Best-effort identity derived from the key alone.
    #[must_use]
    pub fn fallback(key: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: key.to_string(),
        }
    }
}

/// Error surface of an external resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The directory has no entry for the key.
    #[error("user '{0}' not found")]
    NotFound(String),
    /// The backing lookup itself failed.
    #[error("resolver failure: {0}")]
    Backend(String),
}

/// External resolver callback, invoked only on cache miss.
pub trait UserResolver: Send + Sync {
    /// Resolve `key` to a display identity.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the key cannot be resolved; the
    /// service then falls back to the raw key.
    fn resolve(&self, key: &str) -> Result<UserIdentity, ResolveError>;
}

/// Diagnostic counters for one service lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// Number of resolver invocations (cache misses).
    pub lookups: u64,
    /// Of those, how many fell back to the raw key.
    pub misses: u64,
    /// Cumulative wall time spent inside the resolver.
    pub resolver_time: Duration,
}

#[derive(Debug, Default)]
struct LookupState {
    cache: HashMap<String, UserIdentity>,
    stats: LookupStats,
}

/// Memoizing user lookup service.
pub struct UserLookupService {
    resolver: Box<dyn UserResolver>,
    state: Mutex<LookupState>,
}

impl std::fmt::Debug for UserLookupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLookupService")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl UserLookupService {
    /// Wrap an external resolver.
    #[must_use]
    pub fn new(resolver: impl UserResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            state: Mutex::new(LookupState::default()),
        }
    }

    /// Resolve `key`, memoizing the result for the service lifetime.
    ///
    /// An empty key short-circuits to an empty fallback identity without
    /// touching the resolver or the cache.
    #[must_use]
    pub fn lookup(&self, key: &str) -> UserIdentity {
        if key.is_empty() {
            return UserIdentity::fallback("");
        }

        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(identity) = state.cache.get(key) {
            return identity.clone();
        }

        state.stats.lookups += 1;
        let started = Instant::now();
        let resolved = self.resolver.resolve(key);
        state.stats.resolver_time += started.elapsed();

        let identity = match resolved {
            Ok(identity) => identity,
            Err(err) => {
                state.stats.misses += 1;
                warn!(user = %key, error = %err, "user lookup failed; using raw key");
                UserIdentity::fallback(key)
            }
        };

        state.cache.insert(key.to_string(), identity.clone());
        identity
    }

    /// Snapshot of the diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> LookupStats {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats
    }
}
