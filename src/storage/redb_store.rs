// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: id → serialized Account (JSON bytes)
//! - `account_mobile_index`: mobile number → id
//! - `account_meta`: key → value (`last_id` counter)
//!
//! Every mutation runs in a single write transaction, and redb serializes
//! writers, so the mobile uniqueness check and the insert cannot interleave.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{page_offset, AccountStore, StoreError, StoreResult};
use crate::models::{Account, NewAccount};

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNTS: TableDefinition<u64, &[u8]> = TableDefinition::new("accounts");

const MOBILE_INDEX: TableDefinition<&str, u64> = TableDefinition::new("account_mobile_index");

const META: TableDefinition<&str, u64> = TableDefinition::new("account_meta");

const LAST_ID_KEY: &str = "last_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
enum DbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("account not found")]
    NotFound,

    #[error("account already exists")]
    AlreadyExists,
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => StoreError::NotFound,
            DbError::AlreadyExists => StoreError::AlreadyExists,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

type DbResult<T> = Result<T, DbError>;

// =============================================================================
// RedbAccountStore
// =============================================================================

/// Embedded, durable account store.
#[derive(Clone)]
pub struct RedbAccountStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbAccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbAccountStore").finish_non_exhaustive()
    }
}

impl RedbAccountStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_inner(path).map_err(StoreError::from)
    }

    fn open_inner(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(MOBILE_INDEX)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run a database closure on the blocking pool.
    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Backend(format!("storage task failed: {e}")))?
            .map_err(StoreError::from)
    }
}

fn insert_account(db: &Database, new: NewAccount) -> DbResult<Account> {
    let write_txn = db.begin_write()?;
    let account = {
        let mut index = write_txn.open_table(MOBILE_INDEX)?;
        if index.get(new.mobile.as_str())?.is_some() {
            return Err(DbError::AlreadyExists);
        }

        let mut meta = write_txn.open_table(META)?;
        let last_id = meta.get(LAST_ID_KEY)?.map(|v| v.value()).unwrap_or(0);
        let id = last_id + 1;
        let account = new.into_account(id);

        let json = serde_json::to_vec(&account)?;
        let mut accounts = write_txn.open_table(ACCOUNTS)?;
        accounts.insert(id, json.as_slice())?;
        index.insert(account.mobile.as_str(), id)?;
        meta.insert(LAST_ID_KEY, id)?;
        account
    };
    write_txn.commit()?;
    Ok(account)
}

fn read_account(db: &Database, id: u64) -> DbResult<Account> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(ACCOUNTS)?;
    match table.get(id)? {
        Some(value) => Ok(serde_json::from_slice(value.value())?),
        None => Err(DbError::NotFound),
    }
}

fn read_account_by_mobile(db: &Database, mobile: &str) -> DbResult<Account> {
    let read_txn = db.begin_read()?;
    let index = read_txn.open_table(MOBILE_INDEX)?;
    let id = index
        .get(mobile)?
        .map(|v| v.value())
        .ok_or(DbError::NotFound)?;
    let table = read_txn.open_table(ACCOUNTS)?;
    match table.get(id)? {
        Some(value) => Ok(serde_json::from_slice(value.value())?),
        None => Err(DbError::NotFound),
    }
}

fn write_update(db: &Database, update: Account) -> DbResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(ACCOUNTS)?;

        // Read existing value and deserialize before mutating
        let existing_bytes = {
            let existing = table.get(update.id)?.ok_or(DbError::NotFound)?;
            existing.value().to_vec()
        };

        let mut stored: Account = serde_json::from_slice(&existing_bytes)?;
        stored.verification = update.verification;
        stored.verification_expire = update.verification_expire;
        stored.updated_at = update.updated_at;

        let json = serde_json::to_vec(&stored)?;
        table.insert(stored.id, json.as_slice())?;
    }
    write_txn.commit()?;
    Ok(())
}

fn read_page(db: &Database, page: u64, limit: u64) -> DbResult<Vec<Account>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(ACCOUNTS)?;
    let take = usize::try_from(limit).unwrap_or(usize::MAX);

    let mut accounts = Vec::new();
    for entry in table.iter()?.skip(page_offset(page, limit)).take(take) {
        let (_, value) = entry?;
        accounts.push(serde_json::from_slice(value.value())?);
    }
    Ok(accounts)
}

#[async_trait]
impl AccountStore for RedbAccountStore {
    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        self.run(move |db| insert_account(db, account)).await
    }

    async fn find_by_mobile(&self, mobile: &str) -> StoreResult<Account> {
        let mobile = mobile.to_owned();
        self.run(move |db| read_account_by_mobile(db, &mobile)).await
    }

    async fn find_by_id(&self, id: u64) -> StoreResult<Account> {
        self.run(move |db| read_account(db, id)).await
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        let account = account.clone();
        self.run(move |db| write_update(db, account)).await
    }

    async fn list(&self, page: u64, limit: u64) -> StoreResult<Vec<Account>> {
        self.run(move |db| read_page(db, page, limit)).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(ACCOUNTS)?;
            Ok(())
        })
        .await
    }
}
