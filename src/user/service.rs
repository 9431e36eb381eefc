// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account lifecycle engine.
//!
//! ## Challenge States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `NoChallenge` | code empty |
//! | `Active` | code set, `now < expiry` |
//! | `Expired` | code set, `now >= expiry` |
//!
//! Register creates an account with an active challenge. Login issues a new
//! challenge unless one is active. Verify redeems an active challenge exactly
//! once and mints the session tokens.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, error, info};

use super::challenge::{ChallengeState, OtpChallenge};
use super::{Operation, RequestContext, UserService};
use crate::auth::{AuthError, SessionClaims, TokenMaker, TokenUse};
use crate::clock::Clock;
use crate::envelope::BaseResult;
use crate::models::{MobileInput, NewAccount, OtpInput, PageInput, TokenBundle, UserProfile};
use crate::storage::{AccountStore, StoreError};

pub const ACCOUNT_EXISTS: &str = "account with specified params already exists";
pub const ACCOUNT_NOT_FOUND: &str = "specified account does not exist";
pub const OTP_NOT_EXPIRED: &str = "previous otp not expired, please wait a few minutes";
pub const OTP_INCORRECT: &str = "OTP is not correct";
pub const OTP_EXPIRED: &str = "OTP Expired";

/// Page number used when the caller asks for page < 1.
pub const DEFAULT_PAGE: u64 = 1;
/// Page size used when the caller asks for a size < 1.
pub const DEFAULT_PAGE_SIZE: u64 = 2;

/// Issuer, audience and lifetimes of minted tokens.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// The innermost [`UserService`]: talks to the store and the token signer.
pub struct UserEngine {
    store: Arc<dyn AccountStore>,
    tokens: Arc<dyn TokenMaker>,
    clock: Arc<dyn Clock>,
    otp_ttl: Duration,
    session: SessionPolicy,
}

impl UserEngine {
    pub fn new(
        store: Arc<dyn AccountStore>,
        tokens: Arc<dyn TokenMaker>,
        clock: Arc<dyn Clock>,
        otp_ttl: Duration,
        session: SessionPolicy,
    ) -> Self {
        Self {
            store,
            tokens,
            clock,
            otp_ttl,
            session,
        }
    }

    fn issue_challenge(&self, now: i64) -> OtpChallenge {
        OtpChallenge::issue(now, secs(self.otp_ttl))
    }

    fn mint(&self, subject: u64, issued_at: i64) -> Result<TokenBundle, BaseResult> {
        let access = SessionClaims::new(
            subject,
            &self.session.issuer,
            &self.session.audience,
            issued_at,
            secs(self.session.access_ttl),
            TokenUse::Access,
        );
        let refresh = SessionClaims::new(
            subject,
            &self.session.issuer,
            &self.session.audience,
            issued_at,
            secs(self.session.refresh_ttl),
            TokenUse::Refresh,
        );

        let sign = |claims: &SessionClaims| {
            self.tokens.create_token(claims).map_err(|e| {
                error!(error = %e, account_id = subject, "failed to sign session token");
                BaseResult::internal()
            })
        };
        let token = sign(&access)?;
        let refresh_token = sign(&refresh)?;
        let expire = DateTime::from_timestamp(access.exp, 0).ok_or_else(|| {
            error!(exp = access.exp, "token expiry out of range");
            BaseResult::internal()
        })?;

        Ok(TokenBundle {
            token,
            refresh: refresh_token,
            expire,
        })
    }
}

fn secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Map a store fault to a 500, or the given business message otherwise.
fn store_failure(operation: Operation, err: StoreError, not_found: &str) -> BaseResult {
    match err {
        StoreError::NotFound => BaseResult::failure(not_found),
        StoreError::AlreadyExists => BaseResult::failure(ACCOUNT_EXISTS),
        StoreError::Backend(cause) => {
            error!(operation = %operation, error = %cause, "account store failure");
            BaseResult::internal()
        }
    }
}

fn delivery_message(code: &str, mobile: &str) -> String {
    format!("{code} for : {mobile}")
}

#[async_trait]
impl UserService for UserEngine {
    async fn register(&self, _ctx: &RequestContext, input: MobileInput) -> BaseResult {
        let now = self.clock.now();
        let challenge = self.issue_challenge(now.timestamp());
        let code = challenge.code.clone();
        let new = NewAccount {
            mobile: input.mobile,
            challenge,
            created_at: now,
        };

        match self.store.create(new).await {
            Ok(account) => {
                info!(account_id = account.id, "account registered");
                BaseResult::success(delivery_message(&code, &account.mobile))
            }
            Err(e) => store_failure(Operation::Register, e, ACCOUNT_NOT_FOUND),
        }
    }

    async fn login(&self, _ctx: &RequestContext, input: MobileInput) -> BaseResult {
        let mut account = match self.store.find_by_mobile(&input.mobile).await {
            Ok(account) => account,
            Err(e) => return store_failure(Operation::Login, e, ACCOUNT_NOT_FOUND),
        };

        let now = self.clock.now();
        if account.challenge_state(now.timestamp()) == ChallengeState::Active {
            debug!(account_id = account.id, "login refused, challenge still active");
            return BaseResult::failure(OTP_NOT_EXPIRED);
        }

        let challenge = self.issue_challenge(now.timestamp());
        let code = challenge.code.clone();
        account.apply_challenge(challenge, now);
        if let Err(e) = self.store.update(&account).await {
            return store_failure(Operation::Login, e, ACCOUNT_NOT_FOUND);
        }

        info!(account_id = account.id, "login challenge issued");
        BaseResult::success(delivery_message(&code, &account.mobile))
    }

    async fn verify_otp(&self, _ctx: &RequestContext, input: OtpInput) -> BaseResult {
        let mut account = match self.store.find_by_mobile(&input.mobile).await {
            Ok(account) => account,
            Err(e) => return store_failure(Operation::VerifyOtp, e, ACCOUNT_NOT_FOUND),
        };

        let now = self.clock.now();
        let challenge = account.challenge();
        if !challenge.matches(&input.verification) {
            debug!(account_id = account.id, "verification code mismatch");
            return BaseResult::failure(OTP_INCORRECT);
        }
        if challenge.state(now.timestamp()) == ChallengeState::Expired {
            debug!(account_id = account.id, "verification code expired");
            return BaseResult::failure(OTP_EXPIRED);
        }

        account.redeem_challenge(now);
        if let Err(e) = self.store.update(&account).await {
            return store_failure(Operation::VerifyOtp, e, ACCOUNT_NOT_FOUND);
        }

        match self.mint(account.id, now.timestamp()) {
            Ok(bundle) => {
                info!(account_id = account.id, "verification succeeded, session issued");
                BaseResult::success(bundle)
            }
            Err(result) => result,
        }
    }

    async fn get_user(&self, ctx: &RequestContext) -> BaseResult {
        let Some(claims) = ctx.claims.as_ref() else {
            return BaseResult::failure(AuthError::MissingAuthHeader.to_string());
        };
        match self.store.find_by_id(claims.sub).await {
            Ok(account) => BaseResult::success(UserProfile::from(account)),
            Err(e) => store_failure(Operation::GetUser, e, ACCOUNT_NOT_FOUND),
        }
    }

    async fn get_all_users(&self, _ctx: &RequestContext, input: PageInput) -> BaseResult {
        let page = u64::try_from(input.page)
            .ok()
            .filter(|page| *page >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let limit = u64::try_from(input.offset)
            .ok()
            .filter(|limit| *limit >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        match self.store.list(page, limit).await {
            Ok(accounts) => {
                let profiles: Vec<UserProfile> =
                    accounts.into_iter().map(UserProfile::from).collect();
                BaseResult::list(&profiles)
            }
            Err(e) => store_failure(Operation::GetAllUsers, e, ACCOUNT_NOT_FOUND),
        }
    }
}
