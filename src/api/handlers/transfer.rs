//! Transfer handler

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::super::response::{ApiError, ApiResult, error_codes, ok};
use super::super::state::AppState;
use super::ensure_owner;
use crate::auth::Payload;
use crate::currency::Currency;
use crate::store::{Account, AccountId, Queries, Store};
use crate::transfer::{TransferTxParams, TransferTxResult};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransferRequest {
    #[validate(range(min = 1))]
    pub from_account_id: AccountId,
    #[validate(range(min = 1))]
    pub to_account_id: AccountId,
    #[validate(range(min = 1, message = "amount must be greater than zero"))]
    pub amount: i64,
    pub currency: String,
}

/// POST /api/v1/transfers
///
/// Both accounts must exist in the request currency and the caller must own
/// the source account. The transfer itself runs under the configured deadline.
pub async fn create_transfer<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(payload): Extension<Payload>,
    Json(req): Json<CreateTransferRequest>,
) -> ApiResult<TransferTxResult> {
    req.validate()?;
    let currency: Currency = req
        .currency
        .parse()
        .map_err(|e: crate::currency::CurrencyError| ApiError::bad_request(e.to_string()))?;

    {
        let mut q = state.store().queries().await?;
        let from = valid_account(&mut q, req.from_account_id, currency).await?;
        ensure_owner(&from, &payload)?;
        valid_account(&mut q, req.to_account_id, currency).await?;
    }

    let params = TransferTxParams::new(req.from_account_id, req.to_account_id, req.amount);
    let result = state
        .coordinator
        .transfer_tx_with_deadline(params, state.transfer_timeout)
        .await?;

    ok(result)
}

async fn valid_account<Q: Queries>(
    q: &mut Q,
    id: AccountId,
    currency: Currency,
) -> Result<Account, ApiError> {
    let account = q.get_account(id).await?;
    if account.currency != currency.as_str() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            error_codes::CURRENCY_MISMATCH,
            format!(
                "account [{}] currency mismatch: {} vs {}",
                id, account.currency, currency
            ),
        ));
    }
    Ok(account)
}
