//! Ledger rows and query parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account identifier (PostgreSQL `bigserial`)
pub type AccountId = i64;
pub type EntryId = i64;
pub type TransferId = i64;

/// Account row
///
/// `balance` is in the smallest currency unit and only ever changes through
/// [`UnitOfWork::add_account_balance`](super::UnitOfWork::add_account_balance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub owner: String,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Entry row: one signed balance change of one account
///
/// Positive amount = credit, negative amount = debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Transfer row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

/// Only the owner is updatable; balances move through entries.
#[derive(Debug, Clone)]
pub struct UpdateAccountParams {
    pub id: AccountId,
    pub owner: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateEntryParams {
    pub account_id: AccountId,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateEntryParams {
    pub id: EntryId,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateTransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateTransferParams {
    pub id: TransferId,
    pub amount: i64,
}

/// Limit/offset pagination, ascending by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// `(limit, offset)` as every backend applies them: negatives clamp to 0
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.max(0), self.offset.max(0))
    }

    /// Apply the page to an already ordered iterator
    pub(crate) fn slice<T>(&self, rows: impl Iterator<Item = T>) -> Vec<T> {
        let (limit, offset) = self.bounds();
        rows.skip(offset as usize).take(limit as usize).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}
