use thiserror::Error;

use crate::{db_types::ValidationError, settlement::SettlementError};

#[derive(Debug, Error)]
pub enum ExpenseApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),
    #[error("Expense split not found: {0}")]
    SplitNotFound(String),
    #[error("Settlement computation failed: {0}")]
    Settlement(#[from] SettlementError),
}

#[derive(Debug, Error)]
pub enum SettlementApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Settlement not found: {0}")]
    SettlementNotFound(String),
    #[error("Only the participants of a settlement may view it")]
    NotAParticipant,
    #[error("Only the debtor can mark a settlement as paid")]
    NotYourDebt,
    #[error("The settlement has already been paid")]
    AlreadyPaid,
}

#[derive(Debug, Error)]
pub enum GroupApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Group not found: {0}")]
    GroupNotFound(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("User is already a member of the group")]
    AlreadyMember,
    #[error("Access denied: {0}")]
    AccessDenied(String),
}

#[derive(Debug, Error)]
pub enum UserApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Search term must be at least {0} characters long")]
    SearchTermTooShort(usize),
}
