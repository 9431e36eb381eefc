// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local account store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{page_offset, AccountStore, StoreError, StoreResult};
use crate::models::{Account, NewAccount};

#[derive(Debug, Default)]
struct Inner {
    accounts: BTreeMap<u64, Account>,
    by_mobile: HashMap<String, u64>,
    last_id: u64,
}

/// Accounts held in memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<Inner>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let mut inner = self.inner.write().await;
        if inner.by_mobile.contains_key(&account.mobile) {
            return Err(StoreError::AlreadyExists);
        }
        inner.last_id += 1;
        let id = inner.last_id;
        let account = account.into_account(id);
        inner.by_mobile.insert(account.mobile.clone(), id);
        inner.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn find_by_mobile(&self, mobile: &str) -> StoreResult<Account> {
        let inner = self.inner.read().await;
        inner
            .by_mobile
            .get(mobile)
            .and_then(|id| inner.accounts.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: u64) -> StoreResult<Account> {
        let inner = self.inner.read().await;
        inner.accounts.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .accounts
            .get_mut(&account.id)
            .ok_or(StoreError::NotFound)?;
        stored.verification = account.verification.clone();
        stored.verification_expire = account.verification_expire;
        stored.updated_at = account.updated_at;
        Ok(())
    }

    async fn list(&self, page: u64, limit: u64) -> StoreResult<Vec<Account>> {
        let inner = self.inner.read().await;
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(inner
            .accounts
            .values()
            .skip(page_offset(page, limit))
            .take(take)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::user::challenge::OtpChallenge;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    fn new_account(mobile: &str) -> NewAccount {
        NewAccount {
            mobile: mobile.to_string(),
            challenge: OtpChallenge {
                code: "123456".to_string(),
                expires_at: 1_180,
            },
            created_at: at(1_000),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = InMemoryAccountStore::new();
        let a = store.create(new_account("09120000001")).await.unwrap();
        let b = store.create(new_account("09120000002")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn duplicate_mobile_is_rejected() {
        let store = InMemoryAccountStore::new();
        store.create(new_account("09120000001")).await.unwrap();
        let err = store.create(new_account("09120000001")).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists);
    }

    #[tokio::test]
    async fn concurrent_creates_for_one_mobile_yield_one_account() {
        let store = Arc::new(InMemoryAccountStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(new_account("09120000001")).await
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list(1, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lookups_by_mobile_and_id() {
        let store = InMemoryAccountStore::new();
        let created = store.create(new_account("09120000001")).await.unwrap();

        assert_eq!(store.find_by_mobile("09120000001").await.unwrap(), created);
        assert_eq!(store.find_by_id(created.id).await.unwrap(), created);
        assert_eq!(
            store.find_by_mobile("09129999999").await.unwrap_err(),
            StoreError::NotFound
        );
        assert_eq!(store.find_by_id(99).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn update_keeps_mobile_and_creation_time() {
        let store = InMemoryAccountStore::new();
        let mut account = store.create(new_account("09120000001")).await.unwrap();

        account.mobile = "09127777777".to_string();
        account.verification = "654321".to_string();
        account.verification_expire = 2_000;
        account.updated_at = at(1_500);
        store.update(&account).await.unwrap();

        let stored = store.find_by_id(account.id).await.unwrap();
        assert_eq!(stored.mobile, "09120000001");
        assert_eq!(stored.verification, "654321");
        assert_eq!(stored.verification_expire, 2_000);
        assert_eq!(stored.created_at, at(1_000));
        assert_eq!(stored.updated_at, at(1_500));
    }

    #[tokio::test]
    async fn update_of_unknown_account_fails() {
        let store = InMemoryAccountStore::new();
        let account = new_account("09120000001").into_account(42);
        assert_eq!(store.update(&account).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let store = InMemoryAccountStore::new();
        for i in 0..5 {
            store
                .create(new_account(&format!("0912000000{i}")))
                .await
                .unwrap();
        }

        let ids = |accounts: Vec<Account>| accounts.into_iter().map(|a| a.id).collect::<Vec<_>>();
        assert_eq!(ids(store.list(1, 2).await.unwrap()), vec![1, 2]);
        assert_eq!(ids(store.list(2, 2).await.unwrap()), vec![3, 4]);
        assert_eq!(ids(store.list(3, 2).await.unwrap()), vec![5]);
        assert!(store.list(4, 2).await.unwrap().is_empty());
    }
}
