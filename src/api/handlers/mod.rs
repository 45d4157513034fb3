//! HTTP handlers
//!
//! Every handler except health runs behind the bearer-token gate and reads
//! the verified [`Payload`] from request extensions.

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{ListQuery, get_account, list_account_entries, list_account_transfers};
pub use health::{HealthResponse, health_check};
pub use transfer::{CreateTransferRequest, create_transfer};

use super::response::{ApiError, error_codes};
use crate::auth::Payload;
use crate::store::Account;

/// Reject access to an account the caller does not own
pub(crate) fn ensure_owner(account: &Account, payload: &Payload) -> Result<(), ApiError> {
    if account.owner != payload.username {
        return Err(ApiError::unauthorized(
            error_codes::NOT_OWNER,
            format!(
                "account {} doesn't belong to the authenticated user",
                account.id
            ),
        ));
    }
    Ok(())
}
