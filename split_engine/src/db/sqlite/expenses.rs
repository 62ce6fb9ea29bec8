use chrono::Utc;
use se_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{
        Expense,
        ExpenseId,
        ExpenseSplit,
        ExpenseUpdate,
        ExpenseWithSplits,
        GroupId,
        NewExpense,
        NewSplit,
        SplitId,
    },
};

pub async fn insert_expense(
    group_id: &GroupId,
    expense: NewExpense,
    conn: &mut SqliteConnection,
) -> Result<ExpenseWithSplits, SqliteDatabaseError> {
    let id = ExpenseId::random();
    let now = Utc::now();
    sqlx::query(
        r#"INSERT INTO expenses (id, group_id, paid_by_id, description, amount, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
    )
    .bind(&id)
    .bind(group_id)
    .bind(&expense.paid_by_id)
    .bind(&expense.description)
    .bind(expense.amount)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    let mut splits = Vec::with_capacity(expense.splits.len());
    for split in expense.splits {
        splits.push(insert_split(&id, split, &mut *conn).await?);
    }
    let expense = Expense {
        id,
        group_id: group_id.clone(),
        paid_by_id: expense.paid_by_id,
        description: expense.description,
        amount: expense.amount,
        created_at: now,
        updated_at: now,
    };
    Ok(ExpenseWithSplits { expense, splits })
}

pub async fn insert_split(
    expense_id: &ExpenseId,
    split: NewSplit,
    conn: &mut SqliteConnection,
) -> Result<ExpenseSplit, SqliteDatabaseError> {
    let id = SplitId::random();
    sqlx::query("INSERT INTO expense_splits (id, expense_id, user_id, amount_owed) VALUES ($1, $2, $3, $4)")
        .bind(&id)
        .bind(expense_id)
        .bind(&split.user_id)
        .bind(split.amount_owed)
        .execute(&mut *conn)
        .await?;
    Ok(ExpenseSplit { id, expense_id: expense_id.clone(), user_id: split.user_id, amount_owed: split.amount_owed })
}

pub async fn expense_by_id(
    group_id: &GroupId,
    expense_id: &ExpenseId,
    conn: &mut SqliteConnection,
) -> Result<Option<Expense>, SqliteDatabaseError> {
    let expense = sqlx::query_as::<_, Expense>(
        "SELECT id, group_id, paid_by_id, description, amount, created_at, updated_at
         FROM expenses WHERE id = $1 AND group_id = $2",
    )
    .bind(expense_id)
    .bind(group_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(expense)
}

pub async fn splits_for_expense(
    expense_id: &ExpenseId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExpenseSplit>, SqliteDatabaseError> {
    let splits = sqlx::query_as::<_, ExpenseSplit>(
        "SELECT id, expense_id, user_id, amount_owed FROM expense_splits WHERE expense_id = $1 ORDER BY rowid",
    )
    .bind(expense_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(splits)
}

pub async fn fetch_expense(
    group_id: &GroupId,
    expense_id: &ExpenseId,
    conn: &mut SqliteConnection,
) -> Result<Option<ExpenseWithSplits>, SqliteDatabaseError> {
    let expense = match expense_by_id(group_id, expense_id, &mut *conn).await? {
        Some(e) => e,
        None => return Ok(None),
    };
    let splits = splits_for_expense(expense_id, &mut *conn).await?;
    Ok(Some(ExpenseWithSplits { expense, splits }))
}

async fn attach_splits(
    expenses: Vec<Expense>,
    group_id: &GroupId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExpenseWithSplits>, SqliteDatabaseError> {
    let splits = sqlx::query_as::<_, ExpenseSplit>(
        "SELECT s.id, s.expense_id, s.user_id, s.amount_owed
         FROM expense_splits s INNER JOIN expenses e ON s.expense_id = e.id
         WHERE e.group_id = $1
         ORDER BY s.rowid",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;
    let mut result: Vec<ExpenseWithSplits> =
        expenses.into_iter().map(|expense| ExpenseWithSplits { expense, splits: Vec::new() }).collect();
    for split in splits {
        if let Some(entry) = result.iter_mut().find(|e| e.expense.id == split.expense_id) {
            entry.splits.push(split);
        }
    }
    Ok(result)
}

/// Expenses for display, newest first.
pub async fn fetch_group_expenses(
    group_id: &GroupId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExpenseWithSplits>, SqliteDatabaseError> {
    let expenses = sqlx::query_as::<_, Expense>(
        "SELECT id, group_id, paid_by_id, description, amount, created_at, updated_at
         FROM expenses WHERE group_id = $1 ORDER BY created_at DESC, rowid DESC",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;
    attach_splits(expenses, group_id, &mut *conn).await
}

/// Expenses in creation order, the order the balance accumulator folds the ledger in.
pub async fn fetch_ledger_expenses(
    group_id: &GroupId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExpenseWithSplits>, SqliteDatabaseError> {
    let expenses = sqlx::query_as::<_, Expense>(
        "SELECT id, group_id, paid_by_id, description, amount, created_at, updated_at
         FROM expenses WHERE group_id = $1 ORDER BY created_at ASC, rowid ASC",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;
    attach_splits(expenses, group_id, &mut *conn).await
}

pub async fn update_expense(
    group_id: &GroupId,
    expense_id: &ExpenseId,
    update: ExpenseUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Expense>, SqliteDatabaseError> {
    let current = match expense_by_id(group_id, expense_id, &mut *conn).await? {
        Some(e) => e,
        None => return Ok(None),
    };
    let description = update.description.unwrap_or(current.description);
    let amount = update.amount.unwrap_or(current.amount);
    let now = Utc::now();
    sqlx::query("UPDATE expenses SET description = $1, amount = $2, updated_at = $3 WHERE id = $4 AND group_id = $5")
        .bind(&description)
        .bind(amount)
        .bind(now)
        .bind(expense_id)
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    Ok(Some(Expense { description, amount, updated_at: now, ..current }))
}

pub async fn delete_expense(
    group_id: &GroupId,
    expense_id: &ExpenseId,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND group_id = $2")
        .bind(expense_id)
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn add_split(
    group_id: &GroupId,
    expense_id: &ExpenseId,
    split: NewSplit,
    conn: &mut SqliteConnection,
) -> Result<Option<ExpenseSplit>, SqliteDatabaseError> {
    if expense_by_id(group_id, expense_id, &mut *conn).await?.is_none() {
        return Ok(None);
    }
    insert_split(expense_id, split, conn).await.map(Some)
}

pub async fn update_split(
    split_id: &SplitId,
    amount_owed: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<ExpenseSplit>, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE expense_splits SET amount_owed = $1 WHERE id = $2")
        .bind(amount_owed)
        .bind(split_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    let split = sqlx::query_as::<_, ExpenseSplit>(
        "SELECT id, expense_id, user_id, amount_owed FROM expense_splits WHERE id = $1",
    )
    .bind(split_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(split)
}

pub async fn delete_split(split_id: &SplitId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM expense_splits WHERE id = $1").bind(split_id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}
