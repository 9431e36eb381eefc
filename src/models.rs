// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Stored records and the request/response payloads of the user API.
//!
//! ## Model Categories
//!
//! - **Account**: the stored mobile-number identity and its current OTP challenge
//! - **Inputs**: request bodies and path parameters
//! - **Outputs**: profile and token bundle returned to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::user::challenge::{ChallengeState, OtpChallenge};

// =============================================================================
// Account
// =============================================================================

/// One mobile-number identity as persisted by the account store.
///
/// `verification` is empty when no challenge is outstanding. A non-empty
/// code is only meaningful while the current time is strictly before
/// `verification_expire` (Unix seconds, UTC).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: u64,
    pub mobile: String,
    pub verification: String,
    pub verification_expire: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Current challenge as a (code, expiry) pair.
    pub fn challenge(&self) -> OtpChallenge {
        OtpChallenge {
            code: self.verification.clone(),
            expires_at: self.verification_expire,
        }
    }

    pub fn challenge_state(&self, now: i64) -> ChallengeState {
        self.challenge().state(now)
    }

    /// Attach a fresh challenge.
    pub fn apply_challenge(&mut self, challenge: OtpChallenge, now: DateTime<Utc>) {
        self.verification = challenge.code;
        self.verification_expire = challenge.expires_at;
        self.updated_at = now;
    }

    /// Clear the code and close the window at `now`.
    pub fn redeem_challenge(&mut self, now: DateTime<Utc>) {
        self.verification.clear();
        self.verification_expire = now.timestamp();
        self.updated_at = now;
    }
}

/// Values needed to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub mobile: String,
    pub challenge: OtpChallenge,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub fn into_account(self, id: u64) -> Account {
        Account {
            id,
            mobile: self.mobile,
            verification: self.challenge.code,
            verification_expire: self.challenge.expires_at,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Account as shown to callers. Never carries the verification code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub id: u64,
    pub mobile: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for UserProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            mobile: account.mobile,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Body of signup and signin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MobileInput {
    /// Mobile number of the account.
    pub mobile: String,
}

/// Body of OTP verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct OtpInput {
    pub mobile: String,
    /// The six digit code delivered out of band.
    pub verification: String,
}

/// Paging parameters of the account listing.
///
/// `offset` is the page size and `page` the 1-based page number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PageInput {
    pub offset: i64,
    pub page: i64,
}

// =============================================================================
// Outputs
// =============================================================================

/// Tokens issued after a successful verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TokenBundle {
    /// Encrypted access token.
    pub token: String,
    /// Encrypted refresh token.
    pub refresh: String,
    /// When the access token expires.
    pub expire: DateTime<Utc>,
}
