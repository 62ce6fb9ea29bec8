//! The settlement engine.
//!
//! Two pieces compose, leaves first:
//! * [`balances`] folds a group's expense ledger and its already-paid settlements into one signed balance per user
//!   (the balance accumulator).
//! * [`matcher`] collapses that balance set into a minimal list of directed transfers via a greedy two-pointer sweep
//!   (the debt matcher).
//!
//! Both halves are pure and synchronous; all persistence and transaction handling lives behind the
//! [`crate::LedgerDatabase`] trait. Arithmetic is exact fixed-point cents throughout, so the zero-sum property
//! (balances across a group always sum to exactly zero) holds without any epsilon comparisons.

mod balances;
mod errors;
mod matcher;

pub use balances::{accumulate_balances, Balances};
pub use errors::SettlementError;
pub use matcher::{match_debts, Transfer};
