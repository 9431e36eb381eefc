// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process counter store.
//!
//! Counters live in a bounded LRU map. A live counter is never evicted: when
//! the map is full, expired counters are purged, and if none are left to
//! purge the increment fails so the admission filter fails closed. Expiry
//! uses the tokio clock so tests can pause and advance time.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;

use super::{CounterError, CounterStore};

/// Default number of tracked clients.
pub const DEFAULT_CAPACITY: usize = 100_000;

struct Counter {
    count: u64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

pub struct InMemoryCounterStore {
    counters: Mutex<LruCache<String, Counter>>,
}

impl InMemoryCounterStore {
    /// Create a store tracking at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            counters: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Counter>>, CounterError> {
        self.counters
            .lock()
            .map_err(|_| CounterError::Unavailable("counter lock poisoned".to_string()))
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<u64, CounterError> {
        let now = Instant::now();
        let mut counters = self.lock()?;

        if counters.peek(key).is_some_and(|counter| counter.is_expired(now)) {
            counters.pop(key);
        }
        if !counters.contains(key) && counters.len() >= counters.cap().get() {
            purge_expired(&mut counters, now);
            if counters.len() >= counters.cap().get() {
                return Err(CounterError::Unavailable(
                    "counter store is full of live windows".to_string(),
                ));
            }
        }
        let counter = counters.get_or_insert_mut(key.to_string(), || Counter {
            count: 0,
            expires_at: None,
        });
        counter.count = counter.count.saturating_add(1);
        Ok(counter.count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CounterError> {
        let now = Instant::now();
        let mut counters = self.lock()?;
        if let Some(counter) = counters.get_mut(key) {
            counter.expires_at = Some(now + ttl);
        }
        Ok(())
    }
}

fn purge_expired(counters: &mut LruCache<String, Counter>, now: Instant) {
    let expired: Vec<String> = counters
        .iter()
        .filter(|(_, counter)| counter.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();
    for key in expired {
        counters.pop(&key);
    }
}
