//! Authentication error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::token::TokenError;
use crate::api::response::{ApiResponse, error_codes};

/// Reasons a request is rejected by the auth gate. All map to 401.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header is not provided")]
    MissingHeader,

    #[error("invalid authorization header format")]
    MalformedHeader,

    #[error("unsupported authorization type {0}")]
    UnsupportedScheme(String),

    #[error("invalid token: {0}")]
    InvalidToken(#[source] TokenError),
}

impl AuthError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing header",
            Self::MalformedHeader => "malformed header",
            Self::UnsupportedScheme(_) => "unsupported scheme",
            Self::InvalidToken(_) => "invalid token",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::MissingHeader => error_codes::MISSING_AUTH,
            _ => error_codes::AUTH_FAILED,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(self.code(), self.to_string());
        (self.http_status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(AuthError::MissingHeader.code(), error_codes::MISSING_AUTH);
        assert_eq!(AuthError::MalformedHeader.code(), error_codes::AUTH_FAILED);
        assert_eq!(
            AuthError::InvalidToken(TokenError::Expired).reason(),
            "invalid token"
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            AuthError::UnsupportedScheme("basic".into()).to_string(),
            "unsupported authorization type basic"
        );
        assert_eq!(
            AuthError::InvalidToken(TokenError::Expired).to_string(),
            "invalid token: token has expired"
        );
    }

    #[test]
    fn test_into_response_status() {
        let resp = AuthError::MalformedHeader.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
