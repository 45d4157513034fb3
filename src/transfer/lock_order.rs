//! Lock-order policy
//!
//! Two transfers touching the same pair of accounts in opposite directions
//! must lock the rows in the same global order, otherwise each can end up
//! waiting on the other's lock. Ordering by identifier gives that total order.

/// Return the pair ordered ascending, regardless of which side is "from"
#[inline]
pub fn lock_order<T: Ord>(a: T, b: T) -> (T, T) {
    if b < a { (b, a) } else { (a, b) }
}

/// Role an account plays in a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    From,
    To,
}

/// One balance mutation: which account, in what role, by how much
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceStep<Id> {
    pub account_id: Id,
    pub role: Role,
    pub delta: i64,
}

/// The two balance mutations of a transfer in lock order
///
/// Only the traversal order depends on the identifiers; each delta keeps the
/// sign of its role (`from` is debited, `to` is credited).
pub fn balance_steps<Id: Ord + Copy>(from: Id, to: Id, amount: i64) -> [BalanceStep<Id>; 2] {
    let debit = BalanceStep {
        account_id: from,
        role: Role::From,
        delta: -amount,
    };
    let credit = BalanceStep {
        account_id: to,
        role: Role::To,
        delta: amount,
    };
    // Self-transfer lands here too: same row twice, debit first
    let (first, _) = lock_order(from, to);
    if first == from {
        [debit, credit]
    } else {
        [credit, debit]
    }
}
