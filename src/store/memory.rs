//! In-process ledger backend
//!
//! Behaves like the PostgreSQL backend where the transfer engine cares:
//!
//! - Row locks: every write (and `get_account_for_update`) takes a per-row
//!   `tokio::sync::Mutex` that is held until the unit of work commits, rolls
//!   back, or is dropped. Acquiring locks in inconsistent order deadlocks
//!   exactly as it would in the database.
//! - Key locks: inserting an entry or transfer takes a shared lock on each
//!   referenced account, and deleting an account takes it exclusively. Like
//!   `FOR KEY SHARE`, the shared lock never blocks balance updates.
//! - Read committed: readers see committed rows plus their own staged writes.
//! - Atomic commit: staged writes are applied under one table lock.
//!
//! Faults can be injected per operation to exercise failure paths.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use super::error::{StoreError, StoreResult};
use super::models::{
    Account, AccountId, CreateAccountParams, CreateEntryParams, CreateTransferParams, Entry,
    EntryId, Page, Transfer, TransferId, UpdateAccountParams, UpdateEntryParams,
    UpdateTransferParams,
};
use super::{Queries, Store, UnitOfWork};

/// Operation at which an injected fault fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    CreateTransfer,
    CreateEntry,
    AddAccountBalance,
    Commit,
    Rollback,
}

#[derive(Debug)]
struct Fault {
    point: FaultPoint,
    /// Matching calls to let through before firing
    skip: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Account(AccountId),
    Entry(EntryId),
    Transfer(TransferId),
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
}

/// Uncommitted writes of one unit of work; `None` marks a delete
#[derive(Debug, Default)]
struct Staged {
    accounts: BTreeMap<AccountId, Option<Account>>,
    entries: BTreeMap<EntryId, Option<Entry>>,
    transfers: BTreeMap<TransferId, Option<Transfer>>,
}

impl Staged {
    fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.entries.is_empty() && self.transfers.is_empty()
    }
}

struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<tokio::sync::Mutex<()>>>>,
    key_locks: Mutex<HashMap<AccountId, Arc<RwLock<()>>>>,
    faults: Mutex<Vec<Fault>>,
    next_account_id: AtomicI64,
    next_entry_id: AtomicI64,
    next_transfer_id: AtomicI64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked holder never leaves half-applied state behind: commits apply
    // fully prepared maps. Keep serving after poisoning.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        lock(&self.tables)
    }

    fn row_lock(&self, key: RowKey) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.row_locks).entry(key).or_default().clone()
    }

    fn key_lock(&self, id: AccountId) -> Arc<RwLock<()>> {
        lock(&self.key_locks).entry(id).or_default().clone()
    }

    /// Forget locks nobody holds or waits on. Callers drop their guards first.
    fn evict(&self, rows: &[RowKey], keys: &[AccountId]) {
        if !rows.is_empty() {
            let mut row_locks = lock(&self.row_locks);
            for key in rows {
                if row_locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
                    row_locks.remove(key);
                }
            }
        }
        if !keys.is_empty() {
            let mut key_locks = lock(&self.key_locks);
            for id in keys {
                if key_locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
                    key_locks.remove(id);
                }
            }
        }
    }

    fn check_fault(&self, point: FaultPoint) -> StoreResult<()> {
        let mut faults = lock(&self.faults);
        let Some(pos) = faults.iter().position(|f| f.point == point) else {
            return Ok(());
        };
        if faults[pos].skip > 0 {
            faults[pos].skip -= 1;
            return Ok(());
        }
        faults.remove(pos);
        Err(StoreError::fault(format!("injected fault at {:?}", point)))
    }
}

/// In-memory ledger store
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                key_locks: Mutex::new(HashMap::new()),
                faults: Mutex::new(Vec::new()),
                next_account_id: AtomicI64::new(1),
                next_entry_id: AtomicI64::new(1),
                next_transfer_id: AtomicI64::new(1),
            }),
        }
    }

    /// Fail the next call at `point`
    pub fn inject_fault(&self, point: FaultPoint) {
        self.inject_fault_after(point, 0);
    }

    /// Let `skip` calls at `point` succeed, then fail the next one
    pub fn inject_fault_after(&self, point: FaultPoint, skip: usize) {
        lock(&self.inner.faults).push(Fault { point, skip });
    }

    pub fn clear_faults(&self) {
        lock(&self.inner.faults).clear();
    }

    /// Committed row counts (accounts, entries, transfers)
    pub fn row_counts(&self) -> (usize, usize, usize) {
        let tables = self.inner.tables();
        (
            tables.accounts.len(),
            tables.entries.len(),
            tables.transfers.len(),
        )
    }
}

/// Transaction mode of a [`MemoryQueries`] handle
pub trait Mode: Send + Sync + 'static {
    const AUTOCOMMIT: bool;
}

/// Every write commits immediately
pub enum Autocommit {}

/// Writes are staged until `commit`
pub enum Transactional {}

impl Mode for Autocommit {
    const AUTOCOMMIT: bool = true;
}

impl Mode for Transactional {
    const AUTOCOMMIT: bool = false;
}

#[async_trait]
impl Store for MemoryStore {
    type Queries = MemoryQueries<Autocommit>;
    type Tx = MemoryQueries<Transactional>;

    async fn queries(&self) -> StoreResult<Self::Queries> {
        Ok(MemoryQueries::new(self.inner.clone()))
    }

    async fn begin(&self) -> StoreResult<Self::Tx> {
        Ok(MemoryQueries::new(self.inner.clone()))
    }
}

/// Handle onto a [`MemoryStore`]
///
/// Dropping a transactional handle discards its staged writes and releases
/// its row locks.
pub struct MemoryQueries<M: Mode> {
    inner: Arc<Inner>,
    staged: Staged,
    row_guards: HashMap<RowKey, OwnedMutexGuard<()>>,
    key_shares: HashMap<AccountId, OwnedRwLockReadGuard<()>>,
    key_exclusive: HashMap<AccountId, OwnedRwLockWriteGuard<()>>,
    _mode: PhantomData<M>,
}

impl<M: Mode> MemoryQueries<M> {
    fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            staged: Staged::default(),
            row_guards: HashMap::new(),
            key_shares: HashMap::new(),
            key_exclusive: HashMap::new(),
            _mode: PhantomData,
        }
    }

    async fn lock_row(&mut self, key: RowKey) {
        if self.row_guards.contains_key(&key) {
            return;
        }
        let row_lock = self.inner.row_lock(key);
        let guard = row_lock.lock_owned().await;
        self.row_guards.insert(key, guard);
    }

    async fn share_account_key(&mut self, id: AccountId) {
        if self.key_shares.contains_key(&id) || self.key_exclusive.contains_key(&id) {
            return;
        }
        let guard = self.inner.key_lock(id).read_owned().await;
        self.key_shares.insert(id, guard);
    }

    async fn lock_account_key(&mut self, id: AccountId) {
        if self.key_exclusive.contains_key(&id) {
            return;
        }
        // Upgrade: our own share would block the writer forever
        self.key_shares.remove(&id);
        let guard = self.inner.key_lock(id).write_owned().await;
        self.key_exclusive.insert(id, guard);
    }

    /// Drop every lock guard and evict the unused lock entries
    fn release(&mut self) {
        let rows: Vec<RowKey> = self.row_guards.drain().map(|(key, _)| key).collect();
        let keys: Vec<AccountId> = self
            .key_shares
            .drain()
            .map(|(id, _)| id)
            .chain(self.key_exclusive.drain().map(|(id, _)| id))
            .collect();
        self.inner.evict(&rows, &keys);
    }

    /// Apply staged writes and release locks
    fn apply(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        if !staged.is_empty() {
            let mut tables = self.inner.tables();
            merge_into(&mut tables.accounts, staged.accounts);
            merge_into(&mut tables.entries, staged.entries);
            merge_into(&mut tables.transfers, staged.transfers);
        }
        self.release();
    }

    fn finish_write(&mut self) {
        if M::AUTOCOMMIT {
            self.apply();
        }
    }

    fn account(&self, id: AccountId) -> Option<Account> {
        match self.staged.accounts.get(&id) {
            Some(row) => row.clone(),
            None => self.inner.tables().accounts.get(&id).cloned(),
        }
    }

    fn entry(&self, id: EntryId) -> Option<Entry> {
        match self.staged.entries.get(&id) {
            Some(row) => row.clone(),
            None => self.inner.tables().entries.get(&id).cloned(),
        }
    }

    fn transfer(&self, id: TransferId) -> Option<Transfer> {
        match self.staged.transfers.get(&id) {
            Some(row) => row.clone(),
            None => self.inner.tables().transfers.get(&id).cloned(),
        }
    }

    fn visible_accounts(&self) -> BTreeMap<AccountId, Account> {
        overlay(&self.inner.tables().accounts, &self.staged.accounts)
    }

    fn visible_entries(&self) -> BTreeMap<EntryId, Entry> {
        overlay(&self.inner.tables().entries, &self.staged.entries)
    }

    fn visible_transfers(&self) -> BTreeMap<TransferId, Transfer> {
        overlay(&self.inner.tables().transfers, &self.staged.transfers)
    }

    /// Foreign key check; holds a key share on the account until release
    async fn require_account(&mut self, id: AccountId) -> StoreResult<()> {
        self.share_account_key(id).await;
        if self.account(id).is_none() {
            return Err(StoreError::fault(format!(
                "foreign key violation: account {} does not exist",
                id
            )));
        }
        Ok(())
    }

    async fn check_transfer(&mut self, arg: &CreateTransferParams) -> StoreResult<()> {
        self.require_account(arg.from_account_id).await?;
        self.require_account(arg.to_account_id).await?;
        if arg.amount <= 0 {
            return Err(StoreError::fault(
                "check violation: transfer amount must be positive",
            ));
        }
        Ok(())
    }
}

impl<M: Mode> Drop for MemoryQueries<M> {
    fn drop(&mut self) {
        self.release();
    }
}

fn overlay<T: Clone>(
    committed: &BTreeMap<i64, T>,
    staged: &BTreeMap<i64, Option<T>>,
) -> BTreeMap<i64, T> {
    let mut rows = committed.clone();
    for (id, row) in staged {
        match row {
            Some(row) => rows.insert(*id, row.clone()),
            None => rows.remove(id),
        };
    }
    rows
}

fn merge_into<T>(committed: &mut BTreeMap<i64, T>, staged: BTreeMap<i64, Option<T>>) {
    for (id, row) in staged {
        match row {
            Some(row) => committed.insert(id, row),
            None => committed.remove(&id),
        };
    }
}

#[async_trait]
impl<M: Mode> Queries for MemoryQueries<M> {
    async fn create_account(&mut self, arg: CreateAccountParams) -> StoreResult<Account> {
        let duplicate = self
            .visible_accounts()
            .values()
            .any(|a| a.owner == arg.owner && a.currency == arg.currency);
        if duplicate {
            return Err(StoreError::fault(format!(
                "unique violation: owner {} already has a {} account",
                arg.owner, arg.currency
            )));
        }

        let account = Account {
            id: self.inner.next_account_id.fetch_add(1, Ordering::SeqCst),
            owner: arg.owner,
            balance: arg.balance,
            currency: arg.currency,
            created_at: Utc::now(),
        };
        self.staged
            .accounts
            .insert(account.id, Some(account.clone()));
        self.finish_write();
        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId) -> StoreResult<Account> {
        self.account(id)
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> StoreResult<Account> {
        self.lock_row(RowKey::Account(id)).await;
        let account = self.account(id);
        self.finish_write();
        account.ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn list_accounts(&mut self, owner: Option<&str>, page: Page) -> StoreResult<Vec<Account>> {
        let rows = self.visible_accounts();
        Ok(page.slice(
            rows.into_values()
                .filter(|a| owner.is_none_or(|o| a.owner == o)),
        ))
    }

    async fn update_account(&mut self, arg: UpdateAccountParams) -> StoreResult<Account> {
        self.lock_row(RowKey::Account(arg.id)).await;
        let Some(mut account) = self.account(arg.id) else {
            self.finish_write();
            return Err(StoreError::not_found("account", arg.id));
        };
        account.owner = arg.owner;
        self.staged
            .accounts
            .insert(account.id, Some(account.clone()));
        self.finish_write();
        Ok(account)
    }

    async fn delete_account(&mut self, id: AccountId) -> StoreResult<()> {
        // Waits out every open transaction still referencing the account
        self.lock_account_key(id).await;
        self.lock_row(RowKey::Account(id)).await;
        let result = if self.account(id).is_none() {
            Err(StoreError::not_found("account", id))
        } else if self.visible_entries().values().any(|e| e.account_id == id)
            || self
                .visible_transfers()
                .values()
                .any(|t| t.from_account_id == id || t.to_account_id == id)
        {
            Err(StoreError::fault(format!(
                "foreign key violation: account {} is still referenced",
                id
            )))
        } else {
            self.staged.accounts.insert(id, None);
            Ok(())
        };
        self.finish_write();
        result
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> StoreResult<Entry> {
        self.inner.check_fault(FaultPoint::CreateEntry)?;
        if let Err(e) = self.require_account(arg.account_id).await {
            self.finish_write();
            return Err(e);
        }

        let entry = Entry {
            id: self.inner.next_entry_id.fetch_add(1, Ordering::SeqCst),
            account_id: arg.account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        self.staged.entries.insert(entry.id, Some(entry.clone()));
        self.finish_write();
        Ok(entry)
    }

    async fn get_entry(&mut self, id: EntryId) -> StoreResult<Entry> {
        self.entry(id).ok_or_else(|| StoreError::not_found("entry", id))
    }

    async fn list_entries(&mut self, account_id: AccountId, page: Page) -> StoreResult<Vec<Entry>> {
        let rows = self.visible_entries();
        Ok(page.slice(rows.into_values().filter(|e| e.account_id == account_id)))
    }

    async fn list_all_entries(&mut self, page: Page) -> StoreResult<Vec<Entry>> {
        Ok(page.slice(self.visible_entries().into_values()))
    }

    async fn update_entry(&mut self, arg: UpdateEntryParams) -> StoreResult<Entry> {
        self.lock_row(RowKey::Entry(arg.id)).await;
        let Some(mut entry) = self.entry(arg.id) else {
            self.finish_write();
            return Err(StoreError::not_found("entry", arg.id));
        };
        entry.amount = arg.amount;
        self.staged.entries.insert(entry.id, Some(entry.clone()));
        self.finish_write();
        Ok(entry)
    }

    async fn delete_entry(&mut self, id: EntryId) -> StoreResult<()> {
        self.lock_row(RowKey::Entry(id)).await;
        let result = match self.entry(id) {
            Some(_) => {
                self.staged.entries.insert(id, None);
                Ok(())
            }
            None => Err(StoreError::not_found("entry", id)),
        };
        self.finish_write();
        result
    }

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> StoreResult<Transfer> {
        self.inner.check_fault(FaultPoint::CreateTransfer)?;
        if let Err(e) = self.check_transfer(&arg).await {
            self.finish_write();
            return Err(e);
        }

        let transfer = Transfer {
            id: self.inner.next_transfer_id.fetch_add(1, Ordering::SeqCst),
            from_account_id: arg.from_account_id,
            to_account_id: arg.to_account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        self.staged
            .transfers
            .insert(transfer.id, Some(transfer.clone()));
        self.finish_write();
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: TransferId) -> StoreResult<Transfer> {
        self.transfer(id)
            .ok_or_else(|| StoreError::not_found("transfer", id))
    }

    async fn list_transfers(
        &mut self,
        account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>> {
        let rows = self.visible_transfers();
        Ok(page.slice(
            rows.into_values()
                .filter(|t| t.from_account_id == account_id || t.to_account_id == account_id),
        ))
    }

    async fn list_transfers_from(
        &mut self,
        from_account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>> {
        let rows = self.visible_transfers();
        Ok(page.slice(
            rows.into_values()
                .filter(|t| t.from_account_id == from_account_id),
        ))
    }

    async fn list_transfers_to(
        &mut self,
        to_account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>> {
        let rows = self.visible_transfers();
        Ok(page.slice(rows.into_values().filter(|t| t.to_account_id == to_account_id)))
    }

    async fn list_all_transfers(&mut self, page: Page) -> StoreResult<Vec<Transfer>> {
        Ok(page.slice(self.visible_transfers().into_values()))
    }

    async fn update_transfer(&mut self, arg: UpdateTransferParams) -> StoreResult<Transfer> {
        self.lock_row(RowKey::Transfer(arg.id)).await;
        let Some(mut transfer) = self.transfer(arg.id) else {
            self.finish_write();
            return Err(StoreError::not_found("transfer", arg.id));
        };
        transfer.amount = arg.amount;
        self.staged
            .transfers
            .insert(transfer.id, Some(transfer.clone()));
        self.finish_write();
        Ok(transfer)
    }

    async fn delete_transfer(&mut self, id: TransferId) -> StoreResult<()> {
        self.lock_row(RowKey::Transfer(id)).await;
        let result = match self.transfer(id) {
            Some(_) => {
                self.staged.transfers.insert(id, None);
                Ok(())
            }
            None => Err(StoreError::not_found("transfer", id)),
        };
        self.finish_write();
        result
    }
}

#[async_trait]
impl UnitOfWork for MemoryQueries<Transactional> {
    async fn add_account_balance(&mut self, id: AccountId, delta: i64) -> StoreResult<Account> {
        self.inner.check_fault(FaultPoint::AddAccountBalance)?;
        // Holding the row lock makes read-add-stage one atomic step
        self.lock_row(RowKey::Account(id)).await;
        let mut account = self
            .account(id)
            .ok_or_else(|| StoreError::not_found("account", id))?;
        account.balance = account.balance.checked_add(delta).ok_or_else(|| {
            StoreError::fault(format!("numeric overflow: account {} balance", id))
        })?;
        self.staged
            .accounts
            .insert(account.id, Some(account.clone()));
        Ok(account)
    }

    async fn commit(mut self) -> StoreResult<()> {
        self.inner.check_fault(FaultPoint::Commit)?;
        self.apply();
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        // Staged writes and row locks are released on drop either way
        self.inner.check_fault(FaultPoint::Rollback)
    }
}
