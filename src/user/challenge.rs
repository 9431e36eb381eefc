// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OTP challenge: the (code, expiry) pair attached to an account.

use rand::Rng;
use subtle::ConstantTimeEq;

/// Number of digits in a generated code.
pub const OTP_DIGITS: usize = 6;

/// Where an account stands with respect to its verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    /// No code outstanding.
    NoChallenge,
    /// Code set and `now < expiry`.
    Active,
    /// Code set and `now >= expiry`.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub code: String,
    /// Unix seconds, UTC.
    pub expires_at: i64,
}

impl OtpChallenge {
    /// Fresh random code valid for `ttl_secs` from `now`.
    pub fn issue(now: i64, ttl_secs: i64) -> Self {
        Self {
            code: generate_code(OTP_DIGITS),
            expires_at: now.saturating_add(ttl_secs),
        }
    }

    pub fn state(&self, now: i64) -> ChallengeState {
        if self.code.is_empty() {
            ChallengeState::NoChallenge
        } else if now < self.expires_at {
            ChallengeState::Active
        } else {
            ChallengeState::Expired
        }
    }

    /// Compare a submitted code without leaking where it differs.
    pub fn matches(&self, submitted: &str) -> bool {
        if self.code.is_empty() {
            return false;
        }
        bool::from(self.code.as_bytes().ct_eq(submitted.as_bytes()))
    }
}

/// Independent uniformly random decimal digits; leading zeros allowed.
pub fn generate_code(digits: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..digits)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
