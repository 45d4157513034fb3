//! Token verification contract

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("invalid key size: must be at least {min} bytes, got {actual}")]
    KeyTooShort { min: usize, actual: usize },
}

/// Identity carried by a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    pub fn new(username: &str, issued_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            issued_at,
            expired_at: issued_at + duration,
        }
    }

    pub fn valid(&self) -> Result<(), TokenError> {
        if Utc::now() > self.expired_at {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

/// Issues and verifies bearer tokens
///
/// Implementations decide the cryptographic scheme; callers only rely on
/// `verify_token` returning the payload of a live token or an error.
pub trait TokenMaker: Send + Sync {
    /// Create a token for `username` valid for `duration`
    fn create_token(&self, username: &str, duration: Duration)
    -> Result<(String, Payload), TokenError>;

    /// Check the token and return its payload
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError>;
}
