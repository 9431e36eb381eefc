// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # User Service
//!
//! The OTP account lifecycle and the layers wrapped around it.
//!
//! ## Service Chain
//!
//! ```text
//! handler → authorization → instrumenting → validation → engine
//! ```
//!
//! Every layer implements [`UserService`] and either answers on its own
//! (short-circuit) or delegates to the next one. [`compose`] builds the chain
//! in this fixed order.

pub mod authorization;
pub mod challenge;
pub mod instrumenting;
pub mod service;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::TokenMaker;
use crate::envelope::BaseResult;
use crate::metrics::Metrics;
use crate::models::{MobileInput, OtpInput, PageInput};
use crate::schema::SchemaRegistry;

pub use crate::auth::RequestContext;
pub use authorization::AuthorizationLayer;
pub use instrumenting::InstrumentingLayer;
pub use service::{SessionPolicy, UserEngine};
pub use validation::ValidationLayer;

/// Operations of the user service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Register,
    Login,
    VerifyOtp,
    GetUser,
    GetAllUsers,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Register,
        Operation::Login,
        Operation::VerifyOtp,
        Operation::GetUser,
        Operation::GetAllUsers,
    ];

    /// Method label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Register => "Register",
            Operation::Login => "Login",
            Operation::VerifyOtp => "OtpVerify",
            Operation::GetUser => "GetUserByPhone",
            Operation::GetAllUsers => "GetAllUser",
        }
    }

    /// File stem of the operation's input schema.
    pub fn schema_name(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::VerifyOtp => "verify_otp",
            Operation::GetUser => "get_user",
            Operation::GetAllUsers => "get_all_users",
        }
    }

    /// Whether the caller must present an access token.
    pub fn requires_identity(&self) -> bool {
        matches!(self, Operation::GetUser | Operation::GetAllUsers)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account lifecycle operations. Every outcome, including business
/// failures, is a [`BaseResult`].
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create an account and issue its first code.
    async fn register(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult;

    /// Issue a fresh code unless one is still active.
    async fn login(&self, ctx: &RequestContext, input: MobileInput) -> BaseResult;

    /// Redeem a code for a session token bundle.
    async fn verify_otp(&self, ctx: &RequestContext, input: OtpInput) -> BaseResult;

    /// Profile of the account behind the access token.
    async fn get_user(&self, ctx: &RequestContext) -> BaseResult;

    async fn get_all_users(&self, ctx: &RequestContext, input: PageInput) -> BaseResult;
}

/// Wrap `engine` as engine → validation → instrumenting → authorization.
pub fn compose(
    engine: Arc<dyn UserService>,
    schemas: Arc<SchemaRegistry>,
    metrics: Arc<Metrics>,
    tokens: Arc<dyn TokenMaker>,
) -> Arc<dyn UserService> {
    let validated: Arc<dyn UserService> = Arc::new(ValidationLayer::new(engine, schemas));
    let instrumented: Arc<dyn UserService> = Arc::new(InstrumentingLayer::new(validated, metrics));
    Arc::new(AuthorizationLayer::new(instrumented, tokens))
}
