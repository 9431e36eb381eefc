// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum middleware for client resolution and admission.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use super::{Admission, ClientAddress, ClientResolver, RateLimiter, UNKNOWN_CLIENT};
use crate::envelope::BaseResult;

/// Attach the resolved [`ClientAddress`] to the request.
pub async fn resolve_client(
    State(resolver): State<Arc<ClientResolver>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = resolver.resolve(peer, request.headers());
    request.extensions_mut().insert(client);
    next.run(request).await
}

/// Reject the request when its client is over the window threshold.
pub async fn admit(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ClientAddress>()
        .map(|address| address.0.clone())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    let path = request.uri().path().to_owned();

    match limiter.check(&client, &path).await {
        Ok(Admission::Excluded | Admission::Admitted { .. }) => next.run(request).await,
        Ok(Admission::Limited { count }) => {
            warn!(client = %client, path = %path, count, "rate limit exceeded");
            BaseResult::too_many_requests().into_response()
        }
        Err(e) => {
            error!(client = %client, error = %e, "rate limit counter failure");
            BaseResult::internal().into_response()
        }
    }
}
