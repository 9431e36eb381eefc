// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session claims sealed into tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    /// Bearer token for identity-scoped operations.
    Access,
    /// Long-lived token for obtaining new access tokens.
    Refresh,
}

/// Claims embedded in a session token.
///
/// Timestamps are Unix seconds, UTC. `exp` is always `iat` plus the
/// configured lifetime for the token's use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Account identity.
    pub sub: u64,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
    pub token_use: TokenUse,
}

impl SessionClaims {
    /// Claims for `subject` issued at `issued_at` and valid for `ttl_secs`.
    pub fn new(
        subject: u64,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        issued_at: i64,
        ttl_secs: i64,
        token_use: TokenUse,
    ) -> Self {
        Self {
            sub: subject,
            iss: issuer.into(),
            aud: audience.into(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
            jti: Uuid::new_v4().to_string(),
            token_use,
        }
    }

    /// True once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_issued_at_plus_ttl() {
        let claims = SessionClaims::new(42, "iss", "aud", 1_700_000_000, 3600, TokenUse::Access);
        assert_eq!(claims.exp, 1_700_003_600);
        assert!(!claims.is_expired(1_700_003_599));
        assert!(claims.is_expired(1_700_003_600));
    }

    #[test]
    fn token_use_serializes_lowercase() {
        let claims = SessionClaims::new(1, "iss", "aud", 0, 60, TokenUse::Refresh);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["token_use"], "refresh");
        assert_eq!(json["sub"], 1);
    }

    #[test]
    fn every_token_gets_a_fresh_id() {
        let a = SessionClaims::new(1, "iss", "aud", 0, 60, TokenUse::Access);
        let b = SessionClaims::new(1, "iss", "aud", 0, 60, TokenUse::Access);
        assert_ne!(a.jti, b.jti);
    }
}
