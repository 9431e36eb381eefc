// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PASETO v4.local session tokens.
//!
//! The symmetric key is derived from the configured secret with SHA-256, so
//! any secret of at least [`MIN_SECRET_LEN`] bytes yields a full 32-byte key.
//! Tokens are encrypted, so clients cannot read the claims.

use std::sync::Arc;

use pasetors::errors::Error as PasetorsError;
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::{LocalToken, V4};
use pasetors::Local;
use sha2::{Digest, Sha256};

use super::claims::SessionClaims;
use super::error::TokenError;
use crate::clock::Clock;

/// Shortest secret accepted by [`PasetoMaker::new`].
pub const MIN_SECRET_LEN: usize = 32;

/// Creates and verifies session tokens.
pub trait TokenMaker: Send + Sync {
    fn create_token(&self, claims: &SessionClaims) -> Result<String, TokenError>;

    /// Decrypt `token` and check issuer, audience and expiry.
    fn verify_token(&self, token: &str) -> Result<SessionClaims, TokenError>;
}

pub struct PasetoMaker {
    key: SymmetricKey<V4>,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl PasetoMaker {
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::InvalidKey);
        }
        let digest = Sha256::digest(secret.as_bytes());
        let key = SymmetricKey::<V4>::from(digest.as_slice()).map_err(|_| TokenError::InvalidKey)?;
        Ok(Self {
            key,
            issuer: issuer.into(),
            audience: audience.into(),
            clock,
        })
    }
}

impl std::fmt::Debug for PasetoMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasetoMaker")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenMaker for PasetoMaker {
    fn create_token(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| TokenError::Signing(e.to_string()))?;
        LocalToken::encrypt(&self.key, &payload, None, None)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify_token(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let untrusted =
            UntrustedToken::<Local, V4>::try_from(token).map_err(|err| map_paseto_error(&err))?;
        let trusted = LocalToken::decrypt(&self.key, &untrusted, None, None)
            .map_err(|err| map_paseto_error(&err))?;
        let claims: SessionClaims =
            serde_json::from_str(trusted.payload()).map_err(|_| TokenError::Malformed)?;

        if claims.iss != self.issuer {
            return Err(TokenError::InvalidIssuer);
        }
        if claims.aud != self.audience {
            return Err(TokenError::InvalidAudience);
        }
        if claims.is_expired(self.clock.unix_now()) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn map_paseto_error(err: &PasetorsError) -> TokenError {
    match err {
        PasetorsError::TokenValidation => TokenError::InvalidSignature,
        PasetorsError::Key => TokenError::InvalidKey,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenUse;
    use crate::clock::ManualClock;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const NOW: i64 = 1_700_000_000;

    fn maker(clock: Arc<ManualClock>) -> PasetoMaker {
        PasetoMaker::new(SECRET, "otp-auth", "otp-auth-clients", clock).unwrap()
    }

    fn claims(ttl: i64) -> SessionClaims {
        SessionClaims::new(7, "otp-auth", "otp-auth-clients", NOW, ttl, TokenUse::Access)
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let maker = maker(clock);
        let original = claims(3600);

        let token = maker.create_token(&original).unwrap();
        assert!(token.starts_with("v4.local."));
        assert_eq!(maker.verify_token(&token).unwrap(), original);
    }

    #[test]
    fn short_secret_is_rejected() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let err = PasetoMaker::new("too-short", "iss", "aud", clock).unwrap_err();
        assert_eq!(err, TokenError::InvalidKey);
    }

    #[test]
    fn tampered_token_fails() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let maker = maker(clock);
        let token = maker.create_token(&claims(3600)).unwrap();

        let mut bytes = token.into_bytes();
        let middle = "v4.local.".len() + 20;
        bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(maker.verify_token(&tampered).unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let maker = maker(clock);
        assert_eq!(maker.verify_token("not-a-token").unwrap_err(), TokenError::Malformed);
        assert_eq!(maker.verify_token("").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn token_expires_at_exp() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let maker = maker(clock.clone());
        let token = maker.create_token(&claims(60)).unwrap();

        clock.advance_secs(59);
        assert!(maker.verify_token(&token).is_ok());

        clock.advance_secs(1);
        assert_eq!(maker.verify_token(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn other_key_cannot_open_token() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let ours = maker(clock.clone());
        let theirs = PasetoMaker::new(
            "another-secret-of-sufficient-length!!",
            "otp-auth",
            "otp-auth-clients",
            clock,
        )
        .unwrap();

        let token = theirs.create_token(&claims(3600)).unwrap();
        assert_eq!(ours.verify_token(&token).unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn issuer_and_audience_are_checked() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let maker = maker(clock);

        let mut foreign = claims(3600);
        foreign.iss = "someone-else".to_string();
        let token = maker.create_token(&foreign).unwrap();
        assert_eq!(maker.verify_token(&token).unwrap_err(), TokenError::InvalidIssuer);

        let mut foreign = claims(3600);
        foreign.aud = "another-app".to_string();
        let token = maker.create_token(&foreign).unwrap();
        assert_eq!(maker.verify_token(&token).unwrap_err(), TokenError::InvalidAudience);
    }
}
