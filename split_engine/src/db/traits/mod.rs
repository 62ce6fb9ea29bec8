mod group_management;
mod ledger_database;
mod user_management;

pub use group_management::GroupManagement;
pub use ledger_database::{GroupLedger, LedgerDatabase};
pub use user_management::UserManagement;
