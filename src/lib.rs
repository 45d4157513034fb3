//! ledgerbank - ledger-backed money movement
//!
//! Accounts hold integer balances in a single currency. Every movement of
//! money is a transfer recorded with two entries (a debit and a credit) and
//! applied to both balances inside one database transaction.
//!
//! # Modules
//!
//! - [`store`] - Ledger store traits and the PostgreSQL / in-memory backends
//! - [`transfer`] - Atomic, deadlock-free transfer transaction
//! - [`auth`] - Bearer token verification and the axum gate
//! - [`api`] - HTTP routes
//! - [`currency`] - Supported currency codes
//! - [`config`] / [`logging`] / [`db`] - Process wiring
//! - [`random`] - Seeded test data

pub mod api;
pub mod auth;
pub mod config;
pub mod currency;
pub mod db;
pub mod logging;
pub mod random;
pub mod store;
pub mod transfer;

pub use currency::Currency;
pub use store::{Account, Entry, MemoryStore, PgStore, Store, Transfer};
pub use transfer::{TransferCoordinator, TransferError, TransferTxParams, TransferTxResult};
