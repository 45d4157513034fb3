//! Transfer Coordinator
//!
//! Runs one transfer as a single unit of work:
//!
//! ```text
//! BEGIN
//!   INSERT transfer
//!   INSERT entry (from, -amount)
//!   INSERT entry (to,   +amount)
//!   UPDATE balance  (lower account id first)
//!   UPDATE balance  (higher account id second)
//! COMMIT            (or ROLLBACK on any failure)
//! ```

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::lock_order::{Role, balance_steps};
use super::types::{TransferTxParams, TransferTxResult};
use crate::store::{CreateEntryParams, Store, StoreResult, UnitOfWork};

/// Transfer Coordinator - owns the transactional path of the ledger
pub struct TransferCoordinator<S: Store> {
    store: S,
}

impl<S: Store> TransferCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Move `amount` from one account to another atomically
    ///
    /// `from == to` is allowed and nets to zero on the balance, while still
    /// recording a transfer and both entries.
    pub async fn transfer_tx(
        &self,
        params: TransferTxParams,
    ) -> Result<TransferTxResult, TransferError> {
        if params.amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }

        debug!(
            from_account_id = params.from_account_id,
            to_account_id = params.to_account_id,
            amount = params.amount,
            "Transfer started"
        );

        let mut tx = self.store.begin().await?;

        let result = match apply_transfer(&mut tx, params).await {
            Ok(result) => result,
            Err(cause) => return Err(abort(tx, params, cause).await),
        };

        if let Err(e) = tx.commit().await {
            warn!(
                from_account_id = params.from_account_id,
                to_account_id = params.to_account_id,
                error = %e,
                "Transfer commit failed"
            );
            return Err(TransferError::Failed(e));
        }

        info!(
            transfer_id = result.transfer.id,
            from_account_id = params.from_account_id,
            to_account_id = params.to_account_id,
            amount = params.amount,
            "Transfer committed"
        );
        Ok(result)
    }

    /// [`transfer_tx`](Self::transfer_tx) bounded by a deadline
    ///
    /// On expiry the in-flight unit of work is dropped, which rolls it back
    /// and releases its row locks.
    pub async fn transfer_tx_with_deadline(
        &self,
        params: TransferTxParams,
        deadline: Duration,
    ) -> Result<TransferTxResult, TransferError> {
        match tokio::time::timeout(deadline, self.transfer_tx(params)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    from_account_id = params.from_account_id,
                    to_account_id = params.to_account_id,
                    deadline_ms = deadline.as_millis() as u64,
                    "Transfer cancelled by deadline"
                );
                Err(TransferError::Cancelled(deadline))
            }
        }
    }
}

async fn apply_transfer<T: UnitOfWork>(
    tx: &mut T,
    params: TransferTxParams,
) -> StoreResult<TransferTxResult> {
    let transfer = tx.create_transfer(params.to_create_transfer()).await?;

    let from_entry = tx
        .create_entry(CreateEntryParams {
            account_id: params.from_account_id,
            amount: -params.amount,
        })
        .await?;

    let to_entry = tx
        .create_entry(CreateEntryParams {
            account_id: params.to_account_id,
            amount: params.amount,
        })
        .await?;

    let [first, second] = balance_steps(
        params.from_account_id,
        params.to_account_id,
        params.amount,
    );
    let first_row = tx.add_account_balance(first.account_id, first.delta).await?;
    let second_row = tx
        .add_account_balance(second.account_id, second.delta)
        .await?;

    let (mut from_account, to_account) = match first.role {
        Role::From => (first_row, second_row),
        Role::To => (second_row, first_row),
    };
    if params.from_account_id == params.to_account_id {
        // Same row mutated twice; report its final state on both sides
        from_account = to_account.clone();
    }

    Ok(TransferTxResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

async fn abort<T: UnitOfWork>(
    tx: T,
    params: TransferTxParams,
    cause: crate::store::StoreError,
) -> TransferError {
    match tx.rollback().await {
        Ok(()) => {
            warn!(
                from_account_id = params.from_account_id,
                to_account_id = params.to_account_id,
                error = %cause,
                "Transfer rolled back"
            );
            TransferError::Failed(cause)
        }
        Err(rollback) => {
            error!(
                from_account_id = params.from_account_id,
                to_account_id = params.to_account_id,
                error = %cause,
                rollback_error = %rollback,
                "Transfer rollback failed"
            );
            TransferError::RollbackFailed {
                cause: Box::new(TransferError::Failed(cause)),
                rollback,
            }
        }
    }
}
