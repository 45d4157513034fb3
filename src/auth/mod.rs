//! Bearer token authentication
//!
//! - [`token`]: the [`TokenMaker`] contract and its [`Payload`]
//! - [`jwt`]: HS256 implementation
//! - [`middleware`]: header parsing and the axum gate

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod token;

pub use error::AuthError;
pub use jwt::JwtMaker;
pub use middleware::{auth_middleware, verify_credential};
pub use token::{Payload, TokenError, TokenMaker};
