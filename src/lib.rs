// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OTP Auth Server - One-Time-Password Session Token Service
//!
//! Mobile-number accounts prove possession through a short-lived numeric
//! code and receive PASETO session tokens in exchange.
//!
//! ## Modules
//!
//! - `api` - HTTP routes and handlers (Axum)
//! - `auth` - Session token minting and verification (PASETO v4.local)
//! - `user` - Business engine and its validation, metrics and authorization layers
//! - `ratelimit` - Per-client fixed-window admission filter
//! - `storage` - Account persistence (in-memory or redb)
//! - `server` - Process wiring and graceful shutdown

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ratelimit;
pub mod schema;
pub mod server;
pub mod state;
pub mod storage;
pub mod user;
