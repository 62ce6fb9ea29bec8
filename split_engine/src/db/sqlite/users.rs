use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewUser, User, UserId},
};

pub async fn upsert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, SqliteDatabaseError> {
    let id = user.id.unwrap_or_else(UserId::random);
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, created_at) VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE SET name = excluded.name, email = excluded.email",
    )
    .bind(&id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    user_by_id(&id, conn).await?.ok_or_else(|| SqliteDatabaseError::UserNotFound(id.to_string()))
}

pub async fn user_by_id(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Option<User>, SqliteDatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT id, name, email, created_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn search_users(
    term: &str,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<User>, SqliteDatabaseError> {
    // LIKE is case-insensitive for ASCII in sqlite, which is all the original search promised.
    let pattern = format!("%{}%", term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
    let users = sqlx::query_as::<_, User>(
        "SELECT id, name, email, created_at FROM users
         WHERE name LIKE $1 ESCAPE '\\' OR email LIKE $1 ESCAPE '\\'
         ORDER BY name ASC
         LIMIT $2",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}
