use se_common::Money;

use crate::{
    db_types::{
        Expense,
        ExpenseId,
        ExpenseSplit,
        ExpenseUpdate,
        ExpenseWithSplits,
        GroupId,
        NewExpense,
        NewSplit,
        Settlement,
        SettlementId,
        SettlementStatus,
        SplitId,
        UserId,
    },
    settlement::Transfer,
};

/// A consistent snapshot of everything the balance accumulator needs for one group: the expenses with their splits,
/// and the settlements that have already been paid. Both are read inside a single transaction so the recompute never
/// sees a half-applied mutation.
#[derive(Debug, Clone, Default)]
pub struct GroupLedger {
    pub expenses: Vec<ExpenseWithSplits>,
    pub paid_settlements: Vec<Settlement>,
}

/// This trait defines the highest level of behaviour for backends supporting the SplitEase engine.
///
/// This behaviour includes:
/// * Expense and split mutations (the ledger writes that invalidate derived settlement state).
/// * The atomic delete-then-insert replacement of a group's pending settlements.
/// * Settlement queries and the guarded pending→paid transition.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone {
    type Error: std::error::Error;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new expense and its splits in a single atomic transaction, returning the stored rows.
    async fn insert_expense(&self, group_id: &GroupId, expense: NewExpense) -> Result<ExpenseWithSplits, Self::Error>;

    /// Updates the editable fields of an expense. Fields left `None` in the update are not touched. Returns `None`
    /// when the expense does not exist in the group.
    async fn update_expense(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<Option<Expense>, Self::Error>;

    /// Deletes an expense. Its split records go with it (the schema cascades the delete). Returns whether a row was
    /// deleted.
    async fn delete_expense(&self, group_id: &GroupId, expense_id: &ExpenseId) -> Result<bool, Self::Error>;

    async fn fetch_expense(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
    ) -> Result<Option<ExpenseWithSplits>, Self::Error>;

    /// All expenses for the group with their splits, newest first.
    async fn fetch_group_expenses(&self, group_id: &GroupId) -> Result<Vec<ExpenseWithSplits>, Self::Error>;

    /// Adds a split to an existing expense. Returns `None` when the expense does not exist in the group.
    async fn add_split(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
        split: NewSplit,
    ) -> Result<Option<ExpenseSplit>, Self::Error>;

    /// Returns `None` when the split does not exist.
    async fn update_split(&self, split_id: &SplitId, amount_owed: Money) -> Result<Option<ExpenseSplit>, Self::Error>;

    /// Returns whether a row was deleted.
    async fn delete_split(&self, split_id: &SplitId) -> Result<bool, Self::Error>;

    /// Reads the accumulator's inputs (expenses + splits in creation order, paid settlements) as one consistent
    /// snapshot.
    async fn fetch_group_ledger(&self, group_id: &GroupId) -> Result<GroupLedger, Self::Error>;

    async fn fetch_settlements(
        &self,
        group_id: &GroupId,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, Self::Error>;

    /// In ONE transaction: delete every PENDING settlement for the group, then insert the given transfers as fresh
    /// PENDING rows. PAID rows are never touched. This is the write half of the settlement recompute protocol; the
    /// transaction is also the only concurrency control around it, so when two recomputes race the last commit wins.
    async fn replace_pending_settlements(
        &self,
        group_id: &GroupId,
        transfers: &[Transfer],
    ) -> Result<Vec<Settlement>, Self::Error>;

    async fn fetch_settlement(&self, settlement_id: &SettlementId) -> Result<Option<Settlement>, Self::Error>;

    /// Settlements in which the user participates on either side, optionally scoped to one group and/or one status.
    async fn fetch_settlements_for_user(
        &self,
        user_id: &UserId,
        group_id: Option<&GroupId>,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, Self::Error>;

    /// Transitions a settlement PENDING→PAID. The update is guarded: it only applies while the row is still pending
    /// and `requester` is the debtor, so the transition can happen at most once and never runs backwards. Returns
    /// `None` when the guard did not match (row missing, already paid, or requester is not the debtor).
    async fn mark_settlement_paid(
        &self,
        settlement_id: &SettlementId,
        requester: &UserId,
    ) -> Result<Option<Settlement>, Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
