use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Group, GroupId, GroupMember, GroupSummary, MemberDetail, MemberRole, NewGroup, UserId},
};

pub async fn insert_group(
    group: NewGroup,
    conn: &mut SqliteConnection,
) -> Result<Group, SqliteDatabaseError> {
    let id = GroupId::random();
    let now = Utc::now();
    sqlx::query("INSERT INTO groups (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
        .bind(&id)
        .bind(&group.name)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(Group { id, name: group.name, created_at: now, updated_at: now })
}

pub async fn group_by_id(
    group_id: &GroupId,
    conn: &mut SqliteConnection,
) -> Result<Option<Group>, SqliteDatabaseError> {
    let group =
        sqlx::query_as::<_, Group>("SELECT id, name, created_at, updated_at FROM groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(group)
}

pub async fn groups_for_user(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<GroupSummary>, SqliteDatabaseError> {
    let groups = sqlx::query_as::<_, GroupSummary>(
        "SELECT g.id, g.name, g.created_at, g.updated_at,
                (SELECT COUNT(*) FROM group_members mc WHERE mc.group_id = g.id) AS member_count,
                (SELECT COUNT(*) FROM expenses e WHERE e.group_id = g.id) AS expense_count
         FROM groups g INNER JOIN group_members m ON m.group_id = g.id
         WHERE m.user_id = $1
         ORDER BY g.created_at ASC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(groups)
}

pub async fn update_group(
    group_id: &GroupId,
    name: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Group>, SqliteDatabaseError> {
    let now = Utc::now();
    let result = sqlx::query("UPDATE groups SET name = $1, updated_at = $2 WHERE id = $3")
        .bind(name)
        .bind(now)
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    group_by_id(group_id, conn).await
}

pub async fn delete_group(group_id: &GroupId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM groups WHERE id = $1").bind(group_id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_member(
    group_id: &GroupId,
    user_id: &UserId,
    role: MemberRole,
    conn: &mut SqliteConnection,
) -> Result<GroupMember, SqliteDatabaseError> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO group_members (group_id, user_id, role, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(role.to_string())
    .bind(now)
    .execute(&mut *conn)
    .await;
    let result = match result {
        Ok(r) => r,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(SqliteDatabaseError::DuplicateMember(user_id.to_string(), group_id.to_string()))
        },
        Err(e) => return Err(e.into()),
    };
    Ok(GroupMember {
        id: result.last_insert_rowid(),
        group_id: group_id.clone(),
        user_id: user_id.clone(),
        role,
        created_at: now,
    })
}

pub async fn membership(
    group_id: &GroupId,
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<GroupMember>, SqliteDatabaseError> {
    let member = sqlx::query_as::<_, GroupMember>(
        "SELECT id, group_id, user_id, role, created_at FROM group_members WHERE group_id = $1 AND user_id = $2",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(member)
}

pub async fn members(
    group_id: &GroupId,
    conn: &mut SqliteConnection,
) -> Result<Vec<MemberDetail>, SqliteDatabaseError> {
    let members = sqlx::query_as::<_, MemberDetail>(
        "SELECT m.user_id, u.name, u.email, m.role, m.created_at
         FROM group_members m INNER JOIN users u ON u.id = m.user_id
         WHERE m.group_id = $1
         ORDER BY m.id ASC",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(members)
}
