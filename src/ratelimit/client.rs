// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client address resolution.
//!
//! The socket peer is the client unless the peer is a trusted proxy, in which
//! case the first `X-Forwarded-For` entry (or `X-Real-IP`) is used.

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Address used when neither the peer nor a trusted header is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Resolved client address, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

#[derive(Debug, Clone, Default)]
pub struct ClientResolver {
    trusted_proxies: Vec<IpAddr>,
}

impl ClientResolver {
    pub fn new(trusted_proxies: Vec<IpAddr>) -> Self {
        Self { trusted_proxies }
    }

    pub fn resolve(&self, peer: Option<IpAddr>, headers: &HeaderMap) -> ClientAddress {
        let Some(peer) = peer else {
            return ClientAddress(UNKNOWN_CLIENT.to_string());
        };
        if self.trusted_proxies.contains(&peer) {
            if let Some(forwarded) = forwarded_client(headers) {
                return ClientAddress(forwarded.to_string());
            }
        }
        ClientAddress(peer.to_string())
    }
}

fn header_ip(headers: &HeaderMap, name: &str, first_of_list: bool) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    let candidate = if first_of_list {
        value.split(',').next()?
    } else {
        value
    };
    candidate.trim().parse().ok()
}

fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    header_ip(headers, X_FORWARDED_FOR, true).or_else(|| header_ip(headers, X_REAL_IP, false))
}
