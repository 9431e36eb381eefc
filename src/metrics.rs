// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Metrics
//!
//! In-process counters rendered in the Prometheus text exposition format
//! (version 0.0.4) at `GET /metrics`.
//!
//! ## Series
//!
//! - `api_user_request_count{method}`: calls per user operation
//! - `api_user_request_latency_seconds{method}`: summary (`_sum`, `_count`)
//! - `http_requests_total{method,status}`: every HTTP response

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::user::Operation;

/// Content type of the exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Default)]
struct OperationStats {
    count: AtomicU64,
    latency_micros: AtomicU64,
}

/// Process-wide metric registry.
#[derive(Debug)]
pub struct Metrics {
    operations: HashMap<Operation, OperationStats>,
    http: Mutex<BTreeMap<(String, u16), u64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let operations = Operation::ALL
            .into_iter()
            .map(|operation| (operation, OperationStats::default()))
            .collect();
        Self {
            operations,
            http: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record one completed call of `operation`.
    pub fn observe(&self, operation: Operation, elapsed: Duration) {
        if let Some(stats) = self.operations.get(&operation) {
            let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            stats.count.fetch_add(1, Ordering::Relaxed);
            stats.latency_micros.fetch_add(micros, Ordering::Relaxed);
        }
    }

    /// Calls recorded for `operation`.
    pub fn operation_count(&self, operation: Operation) -> u64 {
        self.operations
            .get(&operation)
            .map(|stats| stats.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn record_http(&self, method: &str, status: u16) {
        let mut http = self.http.lock().unwrap_or_else(|e| e.into_inner());
        *http.entry((method.to_string(), status)).or_insert(0) += 1;
    }

    pub fn http_count(&self, method: &str, status: u16) -> u64 {
        let http = self.http.lock().unwrap_or_else(|e| e.into_inner());
        http.get(&(method.to_string(), status)).copied().unwrap_or(0)
    }

    /// Render every series in the Prometheus text format.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# HELP api_user_request_count Number of requests received.")?;
        writeln!(f, "# TYPE api_user_request_count counter")?;
        for operation in Operation::ALL {
            writeln!(
                f,
                "api_user_request_count{{method=\"{operation}\"}} {}",
                self.operation_count(operation)
            )?;
        }

        writeln!(
            f,
            "# HELP api_user_request_latency_seconds Total duration of requests in seconds."
        )?;
        writeln!(f, "# TYPE api_user_request_latency_seconds summary")?;
        for operation in Operation::ALL {
            let Some(stats) = self.operations.get(&operation) else {
                continue;
            };
            let micros = stats.latency_micros.load(Ordering::Relaxed);
            let count = stats.count.load(Ordering::Relaxed);
            let seconds = Duration::from_micros(micros).as_secs_f64();
            writeln!(
                f,
                "api_user_request_latency_seconds_sum{{method=\"{operation}\"}} {seconds}"
            )?;
            writeln!(
                f,
                "api_user_request_latency_seconds_count{{method=\"{operation}\"}} {count}"
            )?;
        }

        writeln!(f, "# HELP http_requests_total Number of HTTP responses sent.")?;
        writeln!(f, "# TYPE http_requests_total counter")?;
        let http = self.http.lock().unwrap_or_else(|e| e.into_inner());
        for ((method, status), count) in http.iter() {
            writeln!(
                f,
                "http_requests_total{{method=\"{method}\",status=\"{status}\"}} {count}"
            )?;
        }
        Ok(())
    }
}

/// Count every response by method and status.
pub async fn track_http(State(metrics): State<Arc<Metrics>>, request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let response = next.run(request).await;
    metrics.record_http(&method, response.status().as_u16());
    response
}
