// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Storage
//!
//! Persistence for [`Account`] records behind the [`AccountStore`] trait.
//!
//! ## Backends
//!
//! - [`InMemoryAccountStore`]: process-local maps, used when no database path is set
//! - [`RedbAccountStore`]: embedded ACID database (redb) on local disk
//!
//! Both backends guarantee at most one account per mobile number and assign
//! ids in increasing creation order, so listing by id is listing by creation.

pub mod memory;
pub mod redb_store;

use async_trait::async_trait;

use crate::models::{Account, NewAccount};

pub use memory::InMemoryAccountStore;
pub use redb_store::RedbAccountStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("account not found")]
    NotFound,

    #[error("account already exists")]
    AlreadyExists,

    /// Any fault of the underlying storage.
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with [`StoreError::AlreadyExists`] when the
    /// mobile number is taken.
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;

    async fn find_by_mobile(&self, mobile: &str) -> StoreResult<Account>;

    async fn find_by_id(&self, id: u64) -> StoreResult<Account>;

    /// Replace the mutable fields of an existing account. The mobile number
    /// and creation time of the stored record are kept.
    async fn update(&self, account: &Account) -> StoreResult<()>;

    /// One page of accounts ordered by id ascending. `page` is 1-based.
    async fn list(&self, page: u64, limit: u64) -> StoreResult<Vec<Account>>;

    /// Check that the backend can serve reads.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Number of records to skip for a 1-based page.
pub(crate) fn page_offset(page: u64, limit: u64) -> usize {
    let skip = page.saturating_sub(1).saturating_mul(limit);
    usize::try_from(skip).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_zero_based_skip() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(2, 10), 10);
        assert_eq!(page_offset(3, 2), 4);
        assert_eq!(page_offset(0, 10), 0);
    }
}
