//! Transfer Error Types

use thiserror::Error;

use crate::store::StoreError;

/// Errors from the transfer unit of work
///
/// Any error returned here means the transfer left no trace in the store:
/// the transaction was rolled back (or never started) before returning.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Transfer failed: {0}")]
    Failed(#[source] StoreError),

    /// The rollback after a failure failed as well. Both causes are kept.
    #[error("Transfer failed: {cause}; rollback failed: {rollback}")]
    RollbackFailed {
        cause: Box<TransferError>,
        rollback: StoreError,
    },

    #[error("Transfer cancelled: deadline of {0:?} elapsed")]
    Cancelled(std::time::Duration),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::Failed(StoreError::NotFound { .. }) => "ACCOUNT_NOT_FOUND",
            TransferError::Failed(_) => "TRANSFER_FAILED",
            TransferError::RollbackFailed { .. } => "ROLLBACK_FAILED",
            TransferError::Cancelled(_) => "TRANSFER_CANCELLED",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount => 400,
            TransferError::Failed(StoreError::NotFound { .. }) => 404,
            TransferError::Failed(_) | TransferError::RollbackFailed { .. } => 500,
            TransferError::Cancelled(_) => 504,
        }
    }

    /// The store error that started the failure, if any
    pub fn store_cause(&self) -> Option<&StoreError> {
        match self {
            TransferError::Failed(e) => Some(e),
            TransferError::RollbackFailed { cause, .. } => cause.store_cause(),
            _ => None,
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        TransferError::Failed(e)
    }
}
