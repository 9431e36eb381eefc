// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Admission
//!
//! Fixed-window rate limiting keyed by client address.
//!
//! For every request whose path does not start with an excluded prefix the
//! counter `rate_limit:<client>` is incremented. The first increment of a
//! window attaches a time-to-live equal to the window; a count above the
//! threshold rejects the request with 429. Counter store faults reject the
//! request with 500 (fail closed).

pub mod client;
pub mod middleware;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RateLimitConfig;

pub use client::{ClientAddress, ClientResolver, UNKNOWN_CLIENT};
pub use middleware::{admit, resolve_client};
pub use store::InMemoryCounterStore;

const KEY_PREFIX: &str = "rate_limit:";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Expiring counters, in the manner of Redis `INCR` and `EXPIRE`.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key`, creating it at zero when absent or expired, and
    /// return the new value.
    async fn incr(&self, key: &str) -> Result<u64, CounterError>;

    /// Expire `key` after `ttl`. No effect on an absent key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CounterError>;
}

/// Outcome of the admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Path is on the exclusion list; no counter touched.
    Excluded,
    Admitted { count: u64 },
    Limited { count: u64 },
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.config
            .exclude_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Count one request from `client` to `path`.
    pub async fn check(&self, client: &str, path: &str) -> Result<Admission, CounterError> {
        if self.is_excluded(path) {
            return Ok(Admission::Excluded);
        }

        let key = format!("{KEY_PREFIX}{client}");
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store.expire(&key, self.config.window).await?;
        }

        if count > self.config.requests_per_window {
            Ok(Admission::Limited { count })
        } else {
            Ok(Admission::Admitted { count })
        }
    }
}
