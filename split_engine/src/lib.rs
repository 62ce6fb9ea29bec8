//! SplitEase Engine
//!
//! The SplitEase engine is the core of a group-expense-sharing service: members of a group log shared expenses with
//! per-member splits, and the engine keeps track of who owes whom. This library contains the settlement engine and
//! all storage logic. It is transport-agnostic; the HTTP surface lives in the `split_server` crate.
//!
//! The library is divided into three main sections:
//! 1. The settlement engine ([`mod@settlement`]). Pure, synchronous, in-memory logic: the balance accumulator folds a
//!    group's ledger into one signed balance per user, and the debt matcher collapses those balances into a minimal
//!    list of directed transfers. All arithmetic is exact fixed-point ([`se_common::Money`]).
//! 2. Database management and control ([`mod@db`]). Sqlite is the supported backend. You should never need to access
//!    the database directly; use the public API instead. The exception is the data types used in the database, which
//!    are defined in the [`mod@db_types`] module and are public.
//! 3. The engine public API ([`mod@sfe_api`]). This provides the public-facing functionality: expense and split
//!    management (each mutation is followed by a best-effort settlement recompute), settlement queries and the
//!    pending→paid transition, group membership, and user lookup. Backends implement the traits in [`mod@db`] to
//!    plug in under these APIs.
//!
//! The engine also emits events when ledger state changes. A simple actor framework ([`mod@events`]) lets callers
//! hook into these events, e.g. to send notification emails or push updates to connected clients.
mod db;

pub mod db_types;
pub mod events;
pub mod settlement;
mod sfe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{GroupLedger, GroupManagement, LedgerDatabase, UserManagement};
pub use sfe_api::{
    errors::{ExpenseApiError, GroupApiError, SettlementApiError, UserApiError},
    expense_flow_api::ExpenseFlowApi,
    group_api::GroupApi,
    settlement_api::SettlementApi,
    settlement_objects::SettlementSummary,
    user_api::UserApi,
};
