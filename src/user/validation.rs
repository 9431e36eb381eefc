// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Schema validation layer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use super::{Operation, RequestContext, UserService};
use crate::envelope::BaseResult;
use crate::models::{MobileInput, OtpInput, PageInput};
use crate::schema::SchemaRegistry;

/// Rejects inputs that violate the operation's schema with a 400 envelope.
pub struct ValidationLayer {
    next: Arc<dyn UserService>,
    schemas: Arc<SchemaRegistry>,
}

impl ValidationLayer {
    pub fn new(next: Arc<dyn UserService>, schemas: Arc<SchemaRegistry>) -> Self {
        Self { next, schemas }
    }

    /// `Some` envelope when `input` must not reach the next layer.
    fn check(&self, operation: Operation, input: &impl Serialize) -> Option<BaseResult> {
        let value = match serde_json::to_value(input) {
            Ok(value) => value,
            Err(e) => {
                error!(operation = %operation, error = %e, "failed to serialize input for validation");
                return Some(BaseResult::internal());
            }
        };
        let violations = self.schemas.validate(operation, &value);
        if violations.is_empty() {
            return None;
        }
        debug!(operation = %operation, violations = violations.len(), "input rejected by schema");
        Some(BaseResult::bad_request(violations))
    }
}

#[async_trait]
impl UserService for ValidationLayer {
    async fn register(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult {
        if let Some(rejected) = self.check(Operation::Register, &input) {
            return rejected;
        }
        self.next.register(ctx, input).await
    }

    async fn login(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult {
        if let Some(rejected) = self.check(Operation::Login, &input) {
            return rejected;
        }
        self.next.login(ctx, input).await
    }

    async fn verify_otp(&self, ctx: &RequestContext, input: OtpInput) -> BaseResult {
        if let Some(rejected) = self.check(Operation::VerifyOtp, &input) {
            return rejected;
        }
        self.next.verify_otp(ctx, input).await
    }

    async fn get_user(&self, ctx: &RequestContext) -> BaseResult {
        self.next.get_user(ctx).await
    }

    async fn get_all_users(&self, ctx: &RequestContext, input: PageInput) -> BaseResult {
        if let Some(rejected) = self.check(Operation::GetAllUsers, &input) {
            return rejected;
        }
        self.next.get_all_users(ctx, input).await
    }
}
