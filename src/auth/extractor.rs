// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request identity context.
//!
//! Handlers extract a [`RequestContext`] and pass it down the service chain.
//! The context only carries the raw `Authorization` header; the authorization
//! layer decides whether the operation needs it and attaches verified claims.
//!
//! ```rust,ignore
//! async fn get_user(ctx: RequestContext, State(state): State<AppState>) -> BaseResult {
//!     state.users.get_user(&ctx).await
//! }
//! ```

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::claims::{SessionClaims, TokenUse};
use super::error::AuthError;
use super::paseto::TokenMaker;
use crate::ratelimit::ClientAddress;

const BEARER_PREFIX: &str = "Bearer ";

/// Request-scoped values visible to every layer of the user service.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw `Authorization` header, if present and valid UTF-8.
    pub authorization: Option<String>,
    /// Client address as resolved by the admission filter.
    pub client: Option<String>,
    /// Verified access-token claims, set by the authorization layer.
    pub claims: Option<SessionClaims>,
}

impl RequestContext {
    pub fn with_authorization(mut self, header: impl Into<String>) -> Self {
        self.authorization = Some(header.into());
        self
    }

    pub fn with_claims(mut self, claims: SessionClaims) -> Self {
        self.claims = Some(claims);
        self
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let client = parts
            .extensions
            .get::<ClientAddress>()
            .map(|address| address.0.clone());

        Ok(Self {
            authorization,
            client,
            claims: None,
        })
    }
}

/// Token part of a `Bearer <token>` header.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingAuthHeader)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Verify the bearer token of `ctx` and require it to be an access token.
pub fn authenticate(tokens: &dyn TokenMaker, ctx: &RequestContext) -> Result<SessionClaims, AuthError> {
    let token = bearer_token(ctx.authorization.as_deref())?;
    let claims = tokens.verify_token(token)?;
    if claims.token_use != TokenUse::Access {
        return Err(AuthError::WrongTokenUse);
    }
    Ok(claims)
}
