//! Health check handler

use std::sync::Arc;

use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::super::response::{ApiError, ApiResult, ok};
use super::super::state::AppState;
use crate::store::Store;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    pub timestamp_ms: i64,
    /// Git revision the binary was built from
    pub version: String,
}

/// GET /api/v1/health
///
/// Healthy when a store handle can be acquired. Internal details are logged,
/// never returned.
pub async fn health_check<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<HealthResponse> {
    if let Err(e) = state.store().queries().await {
        tracing::error!(error = %e, "[HEALTH] Store unreachable");
        return Err(ApiError::service_unavailable("unavailable"));
    }
    ok(HealthResponse {
        timestamp_ms: Utc::now().timestamp_millis(),
        version: env!("GIT_HASH").to_string(),
    })
}
