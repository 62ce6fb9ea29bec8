//! The engine public API.
//!
//! Each API is a thin, backend-generic wrapper: [`expense_flow_api::ExpenseFlowApi`] owns the ledger mutations and
//! the settlement recompute protocol, [`settlement_api::SettlementApi`] owns settlement reads and the pending→paid
//! transition, [`group_api::GroupApi`] owns groups and memberships (including the role checks that gate mutations),
//! and [`user_api::UserApi`] owns user records.

pub mod errors;
pub mod expense_flow_api;
pub mod group_api;
pub mod settlement_api;
pub mod settlement_objects;
pub mod user_api;
