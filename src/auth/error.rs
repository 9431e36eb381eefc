// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token and authentication errors.

/// Failures of the token signer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Key material is unusable
    #[error("token key is invalid")]
    InvalidKey,
    /// Sealing the claims failed
    #[error("token signing failed: {0}")]
    Signing(String),
    /// Token is not a well formed v4.local token
    #[error("Token is malformed")]
    Malformed,
    /// Authentication tag did not verify under our key
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token expiry has passed
    #[error("Token has expired")]
    Expired,
    /// Token issuer is not ours
    #[error("Token issuer is invalid")]
    InvalidIssuer,
    /// Token audience is not ours
    #[error("Token audience is invalid")]
    InvalidAudience,
}

impl TokenError {
    /// Whether this is a server-side fault rather than a bad token.
    pub fn is_internal(&self) -> bool {
        matches!(self, TokenError::InvalidKey | TokenError::Signing(_))
    }
}

/// Reasons an identity-scoped request is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// A refresh token was presented where an access token is required
    #[error("Token cannot be used for this operation")]
    WrongTokenUse,
    #[error(transparent)]
    Token(#[from] TokenError),
}
