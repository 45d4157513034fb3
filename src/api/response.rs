//! Response envelope, error codes and the handler error type

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::store::StoreError;
use crate::transfer::TransferError;

/// Unified API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    pub code: i32,
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Standard API error codes
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INVALID_AMOUNT: i32 = 1002;
    pub const CURRENCY_MISMATCH: i32 = 1003;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const NOT_OWNER: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const TRANSFER_FAILED: i32 = 5002;
    pub const TIMEOUT: i32 = 5004;
}

/// Handler error rendered as an [`ApiResponse`] with an HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn unauthorized(code: i32, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::not_found(e.to_string()),
            StoreError::StorageFault(_) => {
                tracing::error!(error = %e, "Storage fault");
                ApiError::internal("internal error")
            }
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &e {
            TransferError::InvalidAmount => error_codes::INVALID_AMOUNT,
            TransferError::Failed(StoreError::NotFound { .. }) => error_codes::NOT_FOUND,
            TransferError::Cancelled(_) => error_codes::TIMEOUT,
            TransferError::Failed(_) | TransferError::RollbackFailed { .. } => {
                // Storage detail stays in the logs
                return ApiError::new(status, error_codes::TRANSFER_FAILED, "transfer failed");
            }
        };
        ApiError::new(status, code, e.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(7)).unwrap();
        assert_eq!(json["code"], error_codes::SUCCESS);
        assert_eq!(json["msg"], "ok");
        assert_eq!(json["data"], 7);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json =
            serde_json::to_value(ApiResponse::<()>::error(error_codes::NOT_FOUND, "gone")).unwrap();
        assert_eq!(json["code"], error_codes::NOT_FOUND);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_service_unavailable_response() {
        let resp = ApiError::service_unavailable("unavailable").into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let e = ApiError::service_unavailable("unavailable");
        assert_eq!(e.code, error_codes::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_transfer_error_mapping() {
        let e = ApiError::from(TransferError::InvalidAmount);
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.code, error_codes::INVALID_AMOUNT);

        let e = ApiError::from(TransferError::Cancelled(Duration::from_millis(5)));
        assert_eq!(e.status, StatusCode::GATEWAY_TIMEOUT);

        let e = ApiError::from(TransferError::from(StoreError::not_found("account", 9)));
        assert_eq!(e.status, StatusCode::NOT_FOUND);

        let e = ApiError::from(TransferError::from(StoreError::fault("disk")));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code, error_codes::TRANSFER_FAILED);
    }

    #[test]
    fn test_storage_fault_hides_detail() {
        let e = ApiError::from(StoreError::fault("connection reset by peer"));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.msg.contains("peer"));
    }
}
