use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{GroupId, Settlement, SettlementId, SettlementStatus, UserId},
    settlement::Transfer,
};

const SETTLEMENT_COLUMNS: &str = "id, group_id, from_user_id, to_user_id, amount, status, created_at, updated_at";

/// Settlements for display, newest first.
pub async fn fetch_settlements(
    group_id: &GroupId,
    status: Option<SettlementStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Settlement>, SqliteDatabaseError> {
    let settlements = match status {
        Some(status) => {
            sqlx::query_as::<_, Settlement>(&format!(
                "SELECT {SETTLEMENT_COLUMNS} FROM settlements
                 WHERE group_id = $1 AND status = $2 ORDER BY created_at DESC, rowid DESC"
            ))
            .bind(group_id)
            .bind(status.to_string())
            .fetch_all(&mut *conn)
            .await?
        },
        None => {
            sqlx::query_as::<_, Settlement>(&format!(
                "SELECT {SETTLEMENT_COLUMNS} FROM settlements WHERE group_id = $1 ORDER BY created_at DESC, rowid DESC"
            ))
            .bind(group_id)
            .fetch_all(&mut *conn)
            .await?
        },
    };
    Ok(settlements)
}

/// Paid settlements in the order they were marked paid, the order the balance accumulator folds them in.
pub async fn fetch_paid_for_ledger(
    group_id: &GroupId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Settlement>, SqliteDatabaseError> {
    let settlements = sqlx::query_as::<_, Settlement>(&format!(
        "SELECT {SETTLEMENT_COLUMNS} FROM settlements
         WHERE group_id = $1 AND status = $2 ORDER BY updated_at ASC, rowid ASC"
    ))
    .bind(group_id)
    .bind(SettlementStatus::Paid.to_string())
    .fetch_all(&mut *conn)
    .await?;
    Ok(settlements)
}

pub async fn delete_pending(group_id: &GroupId, conn: &mut SqliteConnection) -> Result<u64, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM settlements WHERE group_id = $1 AND status = $2")
        .bind(group_id)
        .bind(SettlementStatus::Pending.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_pending(
    group_id: &GroupId,
    transfer: &Transfer,
    conn: &mut SqliteConnection,
) -> Result<Settlement, SqliteDatabaseError> {
    let id = SettlementId::random();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO settlements (id, group_id, from_user_id, to_user_id, amount, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&id)
    .bind(group_id)
    .bind(&transfer.from_user_id)
    .bind(&transfer.to_user_id)
    .bind(transfer.amount)
    .bind(SettlementStatus::Pending.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(Settlement {
        id,
        group_id: group_id.clone(),
        from_user_id: transfer.from_user_id.clone(),
        to_user_id: transfer.to_user_id.clone(),
        amount: transfer.amount,
        status: SettlementStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}

pub async fn settlement_by_id(
    settlement_id: &SettlementId,
    conn: &mut SqliteConnection,
) -> Result<Option<Settlement>, SqliteDatabaseError> {
    let settlement =
        sqlx::query_as::<_, Settlement>(&format!("SELECT {SETTLEMENT_COLUMNS} FROM settlements WHERE id = $1"))
            .bind(settlement_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(settlement)
}

pub async fn settlements_for_user(
    user_id: &UserId,
    group_id: Option<&GroupId>,
    status: Option<SettlementStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Settlement>, SqliteDatabaseError> {
    let mut sql = format!(
        "SELECT {SETTLEMENT_COLUMNS} FROM settlements WHERE (from_user_id = $1 OR to_user_id = $1)"
    );
    if group_id.is_some() {
        sql.push_str(" AND group_id = $2");
    }
    if status.is_some() {
        sql.push_str(if group_id.is_some() { " AND status = $3" } else { " AND status = $2" });
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");
    let mut query = sqlx::query_as::<_, Settlement>(&sql).bind(user_id);
    if let Some(group_id) = group_id {
        query = query.bind(group_id);
    }
    if let Some(status) = status {
        query = query.bind(status.to_string());
    }
    let settlements = query.fetch_all(&mut *conn).await?;
    Ok(settlements)
}

/// PENDING→PAID, guarded so the transition applies at most once and only at the debtor's request. `None` when the
/// guard did not match a row.
pub async fn mark_paid(
    settlement_id: &SettlementId,
    requester: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<Settlement>, SqliteDatabaseError> {
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE settlements SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 AND from_user_id = $5",
    )
    .bind(SettlementStatus::Paid.to_string())
    .bind(now)
    .bind(settlement_id)
    .bind(SettlementStatus::Pending.to_string())
    .bind(requester)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    settlement_by_id(settlement_id, conn).await
}
