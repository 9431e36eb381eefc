// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens for verified accounts.
//!
//! ## Token Flow
//!
//! 1. Client proves control of a mobile number by submitting the OTP
//! 2. Server mints a PASETO v4.local access token and a refresh token
//! 3. Client sends `Authorization: Bearer <access token>` on identity-scoped calls
//! 4. Server decrypts the token and checks:
//!    - issuer and audience
//!    - expiry against the service clock
//!    - that the token is an access token
//!
//! ## Security
//!
//! - Tokens are encrypted and authenticated with a key derived from `TOKEN_SECRET`
//! - Tokens and codes are never logged

pub mod claims;
pub mod error;
pub mod extractor;
pub mod paseto;

pub use claims::{SessionClaims, TokenUse};
pub use error::{AuthError, TokenError};
pub use extractor::{authenticate, bearer_token, RequestContext};
pub use paseto::{PasetoMaker, TokenMaker};
