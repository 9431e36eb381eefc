// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer-token authorization layer.
//!
//! Identity-scoped operations (`get_user`, `get_all_users`) need a valid
//! access token. On failure the layer answers with a business error
//! envelope and never calls the next layer. Register, login and verify pass
//! through untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::{Operation, RequestContext, UserService};
use crate::auth::{authenticate, AuthError, TokenMaker};
use crate::envelope::BaseResult;
use crate::models::{MobileInput, OtpInput, PageInput};

pub struct AuthorizationLayer {
    next: Arc<dyn UserService>,
    tokens: Arc<dyn TokenMaker>,
}

impl AuthorizationLayer {
    pub fn new(next: Arc<dyn UserService>, tokens: Arc<dyn TokenMaker>) -> Self {
        Self { next, tokens }
    }

    /// Context carrying verified claims, or the envelope to answer with.
    fn authorize(&self, operation: Operation, ctx: &RequestContext) -> Result<RequestContext, BaseResult> {
        match authenticate(self.tokens.as_ref(), ctx) {
            Ok(claims) => Ok(ctx.clone().with_claims(claims)),
            Err(AuthError::Token(e)) if e.is_internal() => {
                error!(operation = %operation, error = %e, "token verification fault");
                Err(BaseResult::internal())
            }
            Err(e) => {
                debug!(operation = %operation, reason = %e, "request not authorized");
                Err(BaseResult::failure(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl UserService for AuthorizationLayer {
    async fn register(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult {
        self.next.register(ctx, input).await
    }

    async fn login(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult {
        self.next.login(ctx, input).await
    }

    async fn verify_otp(&self, ctx: &RequestContext, input: OtpInput) -> BaseResult {
        self.next.verify_otp(ctx, input).await
    }

    async fn get_user(&self, ctx: &RequestContext) -> BaseResult {
        match self.authorize(Operation::GetUser, ctx) {
            Ok(ctx) => self.next.get_user(&ctx).await,
            Err(rejected) => rejected,
        }
    }

    async fn get_all_users(&self, ctx: &RequestContext, input: PageInput) -> BaseResult {
        match self.authorize(Operation::GetAllUsers, ctx) {
            Ok(ctx) => self.next.get_all_users(&ctx, input).await,
            Err(rejected) => rejected,
        }
    }
}
