//! Transfer Transaction Engine
//!
//! Moves funds between two accounts as one atomic unit of work on the
//! ledger store.
//!
//! # Safety Invariants
//!
//! 1. **All or nothing**: the transfer row, both entries and both balance
//!    updates commit together or not at all.
//! 2. **Lock order**: balance rows are always locked in ascending account id,
//!    so transfers racing over the same accounts in opposite directions never
//!    wait on each other in a cycle.
//! 3. **Signed by role**: the source is always debited and the destination
//!    always credited, whatever order the rows are touched in.

pub mod coordinator;
pub mod error;
pub mod lock_order;
pub mod types;


pub use coordinator::TransferCoordinator;
pub use error::TransferError;
pub use lock_order::{BalanceStep, Role, balance_steps, lock_order};
pub use types::{TransferTxParams, TransferTxResult};
