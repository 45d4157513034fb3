//! PostgreSQL ledger backend
//!
//! One query type serves both modes: over a pooled connection every statement
//! autocommits, over a [`Transaction`] the statements share one unit of work.

use std::ops::DerefMut;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::error::{StoreError, StoreResult};
use super::models::{
    Account, AccountId, CreateAccountParams, CreateEntryParams, CreateTransferParams, Entry,
    EntryId, Page, Transfer, TransferId, UpdateAccountParams, UpdateEntryParams,
    UpdateTransferParams,
};
use super::{Queries, Store, UnitOfWork};

/// PostgreSQL store over a shared connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Queries = PgQueries<PoolConnection<Postgres>>;
    type Tx = PgQueries<Transaction<'static, Postgres>>;

    async fn queries(&self) -> StoreResult<Self::Queries> {
        Ok(PgQueries::new(self.pool.acquire().await?))
    }

    async fn begin(&self) -> StoreResult<Self::Tx> {
        Ok(PgQueries::new(self.pool.begin().await?))
    }
}

/// Ledger queries bound to one connection
///
/// `C` is either a pooled connection (autonomous mode) or an open transaction.
pub struct PgQueries<C> {
    conn: C,
}

impl<C> PgQueries<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

fn require_deleted(rows_affected: u64, entity: &'static str, id: i64) -> StoreResult<()> {
    if rows_affected == 0 {
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}

#[async_trait]
impl<C> Queries for PgQueries<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn create_account(&mut self, arg: CreateAccountParams) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (owner, balance, currency)
            VALUES ($1, $2, $3)
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(&arg.owner)
        .bind(arg.balance)
        .bind(&arg.currency)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId) -> StoreResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"SELECT id, owner, balance, currency, created_at
               FROM accounts WHERE id = $1 LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> StoreResult<Account> {
        // NO KEY UPDATE keeps concurrent entry inserts (FK KEY SHARE locks) unblocked
        sqlx::query_as::<_, Account>(
            r#"SELECT id, owner, balance, currency, created_at
               FROM accounts WHERE id = $1 LIMIT 1
               FOR NO KEY UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn list_accounts(&mut self, owner: Option<&str>, page: Page) -> StoreResult<Vec<Account>> {
        let (limit, offset) = page.bounds();
        let rows = sqlx::query_as::<_, Account>(
            r#"SELECT id, owner, balance, currency, created_at
               FROM accounts
               WHERE $1::text IS NULL OR owner = $1
               ORDER BY id
               LIMIT $2 OFFSET $3"#,
        )
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn update_account(&mut self, arg: UpdateAccountParams) -> StoreResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"UPDATE accounts SET owner = $2
               WHERE id = $1
               RETURNING id, owner, balance, currency, created_at"#,
        )
        .bind(arg.id)
        .bind(&arg.owner)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("account", arg.id))
    }

    async fn delete_account(&mut self, id: AccountId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        require_deleted(result.rows_affected(), "account", id)
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> StoreResult<Entry> {
        let entry = sqlx::query_as::<_, Entry>(
            r#"
            INSERT INTO entries (account_id, amount)
            VALUES ($1, $2)
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(arg.account_id)
        .bind(arg.amount)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(entry)
    }

    async fn get_entry(&mut self, id: EntryId) -> StoreResult<Entry> {
        sqlx::query_as::<_, Entry>(
            "SELECT id, account_id, amount, created_at FROM entries WHERE id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("entry", id))
    }

    async fn list_entries(&mut self, account_id: AccountId, page: Page) -> StoreResult<Vec<Entry>> {
        let (limit, offset) = page.bounds();
        let rows = sqlx::query_as::<_, Entry>(
            r#"SELECT id, account_id, amount, created_at
               FROM entries
               WHERE account_id = $1
               ORDER BY id
               LIMIT $2 OFFSET $3"#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn list_all_entries(&mut self, page: Page) -> StoreResult<Vec<Entry>> {
        let (limit, offset) = page.bounds();
        let rows = sqlx::query_as::<_, Entry>(
            r#"SELECT id, account_id, amount, created_at
               FROM entries
               ORDER BY id
               LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn update_entry(&mut self, arg: UpdateEntryParams) -> StoreResult<Entry> {
        sqlx::query_as::<_, Entry>(
            r#"UPDATE entries SET amount = $2
               WHERE id = $1
               RETURNING id, account_id, amount, created_at"#,
        )
        .bind(arg.id)
        .bind(arg.amount)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("entry", arg.id))
    }

    async fn delete_entry(&mut self, id: EntryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        require_deleted(result.rows_affected(), "entry", id)
    }

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> StoreResult<Transfer> {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_account_id, to_account_id, amount, created_at
            "#,
        )
        .bind(arg.from_account_id)
        .bind(arg.to_account_id)
        .bind(arg.amount)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: TransferId) -> StoreResult<Transfer> {
        sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers WHERE id = $1 LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("transfer", id))
    }

    async fn list_transfers(
        &mut self,
        account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>> {
        let (limit, offset) = page.bounds();
        let rows = sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers
               WHERE from_account_id = $1 OR to_account_id = $1
               ORDER BY id
               LIMIT $2 OFFSET $3"#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn list_transfers_from(
        &mut self,
        from_account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>> {
        let (limit, offset) = page.bounds();
        let rows = sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers
               WHERE from_account_id = $1
               ORDER BY id
               LIMIT $2 OFFSET $3"#,
        )
        .bind(from_account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn list_transfers_to(
        &mut self,
        to_account_id: AccountId,
        page: Page,
    ) -> StoreResult<Vec<Transfer>> {
        let (limit, offset) = page.bounds();
        let rows = sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers
               WHERE to_account_id = $1
               ORDER BY id
               LIMIT $2 OFFSET $3"#,
        )
        .bind(to_account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn list_all_transfers(&mut self, page: Page) -> StoreResult<Vec<Transfer>> {
        let (limit, offset) = page.bounds();
        let rows = sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers
               ORDER BY id
               LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn update_transfer(&mut self, arg: UpdateTransferParams) -> StoreResult<Transfer> {
        sqlx::query_as::<_, Transfer>(
            r#"UPDATE transfers SET amount = $2
               WHERE id = $1
               RETURNING id, from_account_id, to_account_id, amount, created_at"#,
        )
        .bind(arg.id)
        .bind(arg.amount)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("transfer", arg.id))
    }

    async fn delete_transfer(&mut self, id: TransferId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM transfers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        require_deleted(result.rows_affected(), "transfer", id)
    }
}

#[async_trait]
impl UnitOfWork for PgQueries<Transaction<'static, Postgres>> {
    async fn add_account_balance(&mut self, id: AccountId, delta: i64) -> StoreResult<Account> {
        // Single atomic increment; the UPDATE holds the row lock until commit
        sqlx::query_as::<_, Account>(
            r#"UPDATE accounts SET balance = balance + $1
               WHERE id = $2
               RETURNING id, owner, balance, currency, created_at"#,
        )
        .bind(delta)
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn commit(self) -> StoreResult<()> {
        self.conn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.conn.rollback().await?;
        Ok(())
    }
}
