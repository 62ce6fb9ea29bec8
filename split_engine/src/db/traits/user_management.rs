use crate::db_types::{NewUser, User, UserId};

/// The `UserManagement` trait defines behaviour for user records.
///
/// Identity itself (credentials, sessions) is owned by an external provider; the engine only keeps the user rows it
/// needs for membership, notifications and lookup.
#[allow(async_fn_in_trait)]
pub trait UserManagement: Clone {
    type Error: std::error::Error;

    /// Inserts the user, or updates name/email when a row with the same id already exists.
    async fn upsert_user(&self, user: NewUser) -> Result<User, Self::Error>;

    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, Self::Error>;

    /// Case-insensitive substring search over names and email addresses, capped at `limit` rows.
    async fn search_users(&self, term: &str, limit: i64) -> Result<Vec<User>, Self::Error>;
}
