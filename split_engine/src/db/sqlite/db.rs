use std::fmt::Debug;

use log::{debug, trace};
use se_common::Money;
use sqlx::SqlitePool;

use super::{expenses, groups, new_pool, settlements, users, SqliteDatabaseError};
use crate::{
    db::traits::{GroupLedger, GroupManagement, LedgerDatabase, UserManagement},
    db_types::{
        Expense,
        ExpenseId,
        ExpenseSplit,
        ExpenseUpdate,
        ExpenseWithSplits,
        Group,
        GroupId,
        GroupMember,
        GroupSummary,
        MemberDetail,
        MemberRole,
        NewExpense,
        NewGroup,
        NewSplit,
        NewUser,
        Settlement,
        SettlementId,
        SettlementStatus,
        SplitId,
        User,
        UserId,
    },
    settlement::Transfer,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LedgerDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_expense(&self, group_id: &GroupId, expense: NewExpense) -> Result<ExpenseWithSplits, Self::Error> {
        let mut tx = self.pool.begin().await?;
        if groups::group_by_id(group_id, &mut tx).await?.is_none() {
            return Err(SqliteDatabaseError::GroupNotFound(group_id.to_string()));
        }
        let stored = expenses::insert_expense(group_id, expense, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Expense {} ({} splits) saved for group {group_id}", stored.expense.id, stored.splits.len());
        Ok(stored)
    }

    async fn update_expense(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<Option<Expense>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let expense = expenses::update_expense(group_id, expense_id, update, &mut conn).await?;
        if expense.is_some() {
            debug!("🗃️ Expense {expense_id} updated for group {group_id}");
        }
        Ok(expense)
    }

    async fn delete_expense(&self, group_id: &GroupId, expense_id: &ExpenseId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let deleted = expenses::delete_expense(group_id, expense_id, &mut conn).await?;
        if deleted {
            debug!("🗃️ Expense {expense_id} deleted from group {group_id}");
        }
        Ok(deleted)
    }

    async fn fetch_expense(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
    ) -> Result<Option<ExpenseWithSplits>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        expenses::fetch_expense(group_id, expense_id, &mut conn).await
    }

    async fn fetch_group_expenses(&self, group_id: &GroupId) -> Result<Vec<ExpenseWithSplits>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        expenses::fetch_group_expenses(group_id, &mut conn).await
    }

    async fn add_split(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
        split: NewSplit,
    ) -> Result<Option<ExpenseSplit>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        expenses::add_split(group_id, expense_id, split, &mut conn).await
    }

    async fn update_split(&self, split_id: &SplitId, amount_owed: Money) -> Result<Option<ExpenseSplit>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        expenses::update_split(split_id, amount_owed, &mut conn).await
    }

    async fn delete_split(&self, split_id: &SplitId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        expenses::delete_split(split_id, &mut conn).await
    }

    async fn fetch_group_ledger(&self, group_id: &GroupId) -> Result<GroupLedger, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let expenses = expenses::fetch_ledger_expenses(group_id, &mut tx).await?;
        let paid_settlements = settlements::fetch_paid_for_ledger(group_id, &mut tx).await?;
        tx.commit().await?;
        trace!(
            "🗃️ Ledger snapshot for group {group_id}: {} expenses, {} paid settlements",
            expenses.len(),
            paid_settlements.len()
        );
        Ok(GroupLedger { expenses, paid_settlements })
    }

    async fn fetch_settlements(
        &self,
        group_id: &GroupId,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        settlements::fetch_settlements(group_id, status, &mut conn).await
    }

    /// The write half of the recompute protocol. The delete and every insert share one transaction, so a reader never
    /// observes a partially replaced pending set, and two racing recomputes serialize behind the store with the last
    /// commit winning.
    async fn replace_pending_settlements(
        &self,
        group_id: &GroupId,
        transfers: &[Transfer],
    ) -> Result<Vec<Settlement>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let dropped = settlements::delete_pending(group_id, &mut tx).await?;
        let mut stored = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            stored.push(settlements::insert_pending(group_id, transfer, &mut tx).await?);
        }
        tx.commit().await?;
        debug!("🗃️ Replaced {dropped} pending settlements with {} for group {group_id}", stored.len());
        Ok(stored)
    }

    async fn fetch_settlement(&self, settlement_id: &SettlementId) -> Result<Option<Settlement>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        settlements::settlement_by_id(settlement_id, &mut conn).await
    }

    async fn fetch_settlements_for_user(
        &self,
        user_id: &UserId,
        group_id: Option<&GroupId>,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        settlements::settlements_for_user(user_id, group_id, status, &mut conn).await
    }

    async fn mark_settlement_paid(
        &self,
        settlement_id: &SettlementId,
        requester: &UserId,
    ) -> Result<Option<Settlement>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let settlement = settlements::mark_paid(settlement_id, requester, &mut tx).await?;
        tx.commit().await?;
        if settlement.is_some() {
            debug!("🗃️ Settlement {settlement_id} marked as paid by {requester}");
        }
        Ok(settlement)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl GroupManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn create_group(&self, group: NewGroup, owner: &UserId) -> Result<Group, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let stored = groups::insert_group(group, &mut tx).await?;
        groups::insert_member(&stored.id, owner, MemberRole::Owner, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Group {} created with owner {owner}", stored.id);
        Ok(stored)
    }

    async fn fetch_group(&self, group_id: &GroupId) -> Result<Option<Group>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        groups::group_by_id(group_id, &mut conn).await
    }

    async fn fetch_groups_for_user(&self, user_id: &UserId) -> Result<Vec<GroupSummary>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        groups::groups_for_user(user_id, &mut conn).await
    }

    async fn update_group(&self, group_id: &GroupId, name: &str) -> Result<Option<Group>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        groups::update_group(group_id, name, &mut conn).await
    }

    async fn delete_group(&self, group_id: &GroupId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let deleted = groups::delete_group(group_id, &mut conn).await?;
        if deleted {
            debug!("🗃️ Group {group_id} deleted");
        }
        Ok(deleted)
    }

    async fn add_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: MemberRole,
    ) -> Result<GroupMember, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let member = groups::insert_member(group_id, user_id, role, &mut conn).await?;
        debug!("🗃️ {user_id} joined group {group_id} as {role}");
        Ok(member)
    }

    async fn fetch_membership(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<GroupMember>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        groups::membership(group_id, user_id, &mut conn).await
    }

    async fn fetch_members(&self, group_id: &GroupId) -> Result<Vec<MemberDetail>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        groups::members(group_id, &mut conn).await
    }
}

impl UserManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn upsert_user(&self, user: NewUser) -> Result<User, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        users::upsert_user(user, &mut conn).await
    }

    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        users::user_by_id(user_id, &mut conn).await
    }

    async fn search_users(&self, term: &str, limit: i64) -> Result<Vec<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        users::search_users(term, limit, &mut conn).await
    }
}
