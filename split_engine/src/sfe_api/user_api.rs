use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::UserManagement,
    db_types::{NewUser, User, UserId},
    sfe_api::errors::UserApiError,
};

const MIN_SEARCH_TERM_LEN: usize = 2;
const SEARCH_RESULT_LIMIT: i64 = 10;

/// `UserApi` keeps the user records the engine needs for memberships, search and notifications. Credentials and
/// sessions belong to the external identity provider.
pub struct UserApi<B> {
    db: B,
}

impl<B> Debug for UserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi")
    }
}

impl<B> UserApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> UserApi<B>
where B: UserManagement
{
    pub async fn upsert_user(&self, user: NewUser) -> Result<User, UserApiError> {
        if let Some(id) = &user.id {
            id.validate()?;
        }
        let stored = self.db.upsert_user(user).await.map_err(|e| UserApiError::StorageError(e.to_string()))?;
        debug!("🔄️🙋️ User {} registered", stored.id);
        Ok(stored)
    }

    pub async fn user(&self, user_id: &UserId) -> Result<Option<User>, UserApiError> {
        user_id.validate()?;
        self.db.fetch_user(user_id).await.map_err(|e| UserApiError::StorageError(e.to_string()))
    }

    /// Substring search over names and emails, for the "add member" picker.
    pub async fn search(&self, term: &str) -> Result<Vec<User>, UserApiError> {
        let term = term.trim();
        if term.len() < MIN_SEARCH_TERM_LEN {
            return Err(UserApiError::SearchTermTooShort(MIN_SEARCH_TERM_LEN));
        }
        self.db
            .search_users(term, SEARCH_RESULT_LIMIT)
            .await
            .map_err(|e| UserApiError::StorageError(e.to_string()))
    }
}
