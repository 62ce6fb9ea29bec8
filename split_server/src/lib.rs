//! SplitEase Server
//!
//! The HTTP surface over the [`split_engine`] crate: actix-web routes for groups, members, expenses, splits and
//! settlements, bearer-token authentication, and the notification hooks (email, per-user event streams) that react
//! to ledger changes.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod mailer;
pub mod routes;
pub mod server;
