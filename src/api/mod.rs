//! HTTP surface
//!
//! A thin axum layer over the transfer coordinator and the ledger store.
//! Route layout:
//!
//! - `GET  /api/v1/health` (public)
//! - `POST /api/v1/transfers`
//! - `GET  /api/v1/accounts/{id}`
//! - `GET  /api/v1/accounts/{id}/entries`
//! - `GET  /api/v1/accounts/{id}/transfers`

pub mod handlers;
pub mod response;
pub mod state;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::auth::auth_middleware;
use crate::store::Store;

pub use response::{ApiError, ApiResponse, ApiResult, error_codes};
pub use state::AppState;

/// Build the application router
pub fn router<S: Store + 'static>(state: Arc<AppState<S>>) -> Router {
    // Authenticated routes
    let private_routes = Router::new()
        .route("/api/v1/transfers", post(handlers::create_transfer::<S>))
        .route("/api/v1/accounts/{id}", get(handlers::get_account::<S>))
        .route(
            "/api/v1/accounts/{id}/entries",
            get(handlers::list_account_entries::<S>),
        )
        .route(
            "/api/v1/accounts/{id}/transfers",
            get(handlers::list_account_transfers::<S>),
        )
        .route_layer(from_fn_with_state(
            state.token_maker.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check::<S>))
        .merge(private_routes)
        .with_state(state)
}

/// Serve the router on `addr` until the process is stopped
pub async fn run_server<S: Store + 'static>(
    addr: &str,
    state: Arc<AppState<S>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
