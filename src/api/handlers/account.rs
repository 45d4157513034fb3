//! Account read handlers

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use validator::Validate;

use super::super::response::{ApiResult, ok};
use super::super::state::AppState;
use super::ensure_owner;
use crate::auth::Payload;
use crate::store::{Account, AccountId, Entry, Page, Queries, Store, Transfer};

/// Pagination query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

impl From<&ListQuery> for Page {
    fn from(q: &ListQuery) -> Self {
        Page::new(q.limit, q.offset)
    }
}

/// GET /api/v1/accounts/{id}
pub async fn get_account<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(payload): Extension<Payload>,
    Path(id): Path<AccountId>,
) -> ApiResult<Account> {
    let mut q = state.store().queries().await?;
    let account = q.get_account(id).await?;
    ensure_owner(&account, &payload)?;
    ok(account)
}

/// GET /api/v1/accounts/{id}/entries
pub async fn list_account_entries<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(payload): Extension<Payload>,
    Path(id): Path<AccountId>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Entry>> {
    query.validate()?;
    let mut q = state.store().queries().await?;
    let account = q.get_account(id).await?;
    ensure_owner(&account, &payload)?;
    ok(q.list_entries(id, Page::from(&query)).await?)
}

/// GET /api/v1/accounts/{id}/transfers
///
/// Transfers where the account is either source or destination.
pub async fn list_account_transfers<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(payload): Extension<Payload>,
    Path(id): Path<AccountId>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Transfer>> {
    query.validate()?;
    let mut q = state.store().queries().await?;
    let account = q.get_account(id).await?;
    ensure_owner(&account, &payload)?;
    ok(q.list_transfers(id, Page::from(&query)).await?)
}
