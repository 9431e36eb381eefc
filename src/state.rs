// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Metrics;
use crate::ratelimit::{ClientResolver, RateLimiter};
use crate::storage::AccountStore;
use crate::user::UserService;

/// Router-level switches.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request deadline.
    pub read_timeout: Duration,
    pub swagger_enabled: bool,
    pub cors_enabled: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(10),
            swagger_enabled: false,
            cors_enabled: false,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// Fully composed user service chain.
    pub users: Arc<dyn UserService>,
    /// Account store, for readiness checks.
    pub store: Arc<dyn AccountStore>,
    pub metrics: Arc<Metrics>,
    /// `None` when the admission filter is disabled.
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub client_resolver: Arc<ClientResolver>,
    pub http: HttpSettings,
}

impl AppState {
    pub fn new(users: Arc<dyn UserService>, store: Arc<dyn AccountStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            users,
            store,
            metrics,
            rate_limiter: None,
            client_resolver: Arc::new(ClientResolver::default()),
            http: HttpSettings::default(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_client_resolver(mut self, resolver: ClientResolver) -> Self {
        self.client_resolver = Arc::new(resolver);
        self
    }

    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }
}
