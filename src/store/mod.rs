//! Ledger Store
//!
//! Durable storage for accounts, entries and transfers, split into three
//! capabilities:
//!
//! - [`Queries`]: single-row CRUD and paginated listings. Runs either
//!   autonomously (each statement commits on its own) or inside a transaction.
//! - [`UnitOfWork`]: a transactional [`Queries`] that additionally owns the
//!   balance mutator and ends with `commit` or `rollback`.
//! - [`Store`]: hands out both kinds of handles.
//!
//! Backends: [`PgStore`] (PostgreSQL via sqlx) and [`MemoryStore`]
//! (in-process, row-locking, used by tests).

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

pub use error::{StoreError, StoreResult};
pub use memory::{FaultPoint, MemoryStore};
pub use models::{
    Account, AccountId, CreateAccountParams, CreateEntryParams, CreateTransferParams, Entry,
    EntryId, Page, Transfer, TransferId, UpdateAccountParams, UpdateEntryParams,
    UpdateTransferParams,
};
pub use postgres::PgStore;

/// CRUD and listing operations shared by autonomous and transactional handles
///
/// Read-by-id on a missing row returns [`StoreError::NotFound`].
#[async_trait]
pub trait Queries: Send {
    // === Accounts ===
    async fn create_account(&mut self, arg: CreateAccountParams) -> StoreResult<Account>;
    async fn get_account(&mut self, id: AccountId) -> StoreResult<Account>;
    /// Read an account and hold its row lock until the surrounding transaction ends
    async fn get_account_for_update(&mut self, id: AccountId) -> StoreResult<Account>;
    async fn list_accounts(&mut self, owner: Option<&str>, page: Page) -> StoreResult<Vec<Account>>;
    async fn update_account(&mut self, arg: UpdateAccountParams) -> StoreResult<Account>;
    async fn delete_account(&mut self, id: AccountId) -> StoreResult<()>;

    // === Entries ===
    async fn create_entry(&mut self, arg: CreateEntryParams) -> StoreResult<Entry>;
    async fn get_entry(&mut self, id: EntryId) -> StoreResult<Entry>;
    async fn list_entries(&mut self, account_id: AccountId, page: Page) -> StoreResult<Vec<Entry>>;
    async fn list_all_entries(&mut self, page: Page) -> StoreResult<Vec<Entry>>;
    async fn update_entry(&mut self, arg: UpdateEntryParams) -> StoreResult<Entry>;
    async fn delete_entry(&mut self, id: EntryId) -> StoreResult<()>;

    // === Transfers ===
    async fn create_transfer(&mut self, arg: CreateTransferParams) -> StoreResult<Transfer>;
    async fn get_transfer(&mut self, id: TransferId) -> StoreResult<Transfer>;
    /// Transfers where the account is either source or destination
    async fn list_transfers(
        &mut self,
        account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>>;
    async fn list_transfers_from(
        &mut self,
        from_account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>>;
    async fn list_transfers_to(
        &mut self,
        to_account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>>;
    async fn list_all_transfers(&mut self, page: Page) -> StoreResult<Vec<Transfer>>;
    async fn update_transfer(&mut self, arg: UpdateTransferParams) -> StoreResult<Transfer>;
    async fn delete_transfer(&mut self, id: TransferId) -> StoreResult<()>;
}

/// A transaction against the ledger
///
/// Dropping a unit of work without calling `commit` rolls it back.
#[async_trait]
pub trait UnitOfWork: Queries {
    /// Balance mutator: atomically add `delta` (may be negative) to the stored
    /// balance and return the updated row. The row stays locked until the
    /// transaction ends. Overdraft is not checked here.
    async fn add_account_balance(&mut self, id: AccountId, delta: i64) -> StoreResult<Account>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Entry point to a ledger backend
#[async_trait]
pub trait Store: Send + Sync {
    type Queries: Queries;
    type Tx: UnitOfWork;

    /// Handle whose operations each commit on their own
    async fn queries(&self) -> StoreResult<Self::Queries>;

    /// Start a transaction
    async fn begin(&self) -> StoreResult<Self::Tx>;
}
