// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Metrics layer: counts and times every delegated call.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::{Operation, RequestContext, UserService};
use crate::envelope::BaseResult;
use crate::metrics::Metrics;
use crate::models::{MobileInput, OtpInput, PageInput};

pub struct InstrumentingLayer {
    next: Arc<dyn UserService>,
    metrics: Arc<Metrics>,
}

impl InstrumentingLayer {
    pub fn new(next: Arc<dyn UserService>, metrics: Arc<Metrics>) -> Self {
        Self { next, metrics }
    }

    async fn timed<F>(&self, operation: Operation, call: F) -> BaseResult
    where
        F: Future<Output = BaseResult> + Send,
    {
        let begin = Instant::now();
        let result = call.await;
        self.metrics.observe(operation, begin.elapsed());
        result
    }
}

#[async_trait]
impl UserService for InstrumentingLayer {
    async fn register(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult {
        self.timed(Operation::Register, self.next.register(ctx, input)).await
    }

    async fn login(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult {
        self.timed(Operation::Login, self.next.login(ctx, input)).await
    }

    async fn verify_otp(&self, ctx: &RequestContext, input: OtpInput) -> BaseResult {
        self.timed(Operation::VerifyOtp, self.next.verify_otp(ctx, input)).await
    }

    async fn get_user(&self, ctx: &RequestContext) -> BaseResult {
        self.timed(Operation::GetUser, self.next.get_user(ctx)).await
    }

    async fn get_all_users(&self, ctx: &RequestContext, input: PageInput) -> BaseResult {
        self.timed(Operation::GetAllUsers, self.next.get_all_users(ctx, input)).await
    }
}
