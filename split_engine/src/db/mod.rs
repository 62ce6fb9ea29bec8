//! Database management and control.
//!
//! This module provides the interfaces that define the contracts of the engine's database *backends*.
//!
//! ## Ledger
//! The ledger is the authoritative record of a group's shared expenses, their per-member splits, and the settlement
//! rows derived from them. The [`traits::LedgerDatabase`] trait owns the machinery for mutating the ledger and for the
//! transactional delete-then-insert step that the settlement recompute protocol relies on.
//!
//! ## Traits
//! * [`traits::LedgerDatabase`] defines the highest level of behaviour for backends: expense and split mutations, the
//!   atomic pending-settlement replacement, and settlement queries.
//! * [`traits::GroupManagement`] defines behaviour for managing groups and memberships.
//! * [`traits::UserManagement`] defines behaviour for user records and lookup.

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
