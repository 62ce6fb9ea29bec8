use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Group not found: {0}")]
    GroupNotFound(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("User {0} is already a member of group {1}")]
    DuplicateMember(String, String),
}
