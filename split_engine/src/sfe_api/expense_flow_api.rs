use std::fmt::Debug;

use log::*;
use se_common::Money;

use crate::{
    db::traits::LedgerDatabase,
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
        SplitId,
        UserId,
    },
    events::{EventProducers, ExpenseChange, ExpenseChangedEvent, SettlementsRecomputedEvent},
    settlement::{accumulate_balances, match_debts},
    sfe_api::errors::ExpenseApiError,
};

/// `ExpenseFlowApi` is the primary API for mutating a group's expense ledger.
///
/// Every mutation follows the same shape: validate, write, emit an event, then refresh the group's derived
/// settlement state. The refresh is the settlement recompute protocol — fold the ledger and the paid settlements
/// into balances, run the debt matcher, and atomically swap the group's pending settlement rows for the matcher's
/// new answer. The refresh is deliberately best-effort on the mutation path: a failed recompute is logged and
/// swallowed, because serving a stale settlement view until the next recompute beats rolling back a legitimate
/// expense edit.
pub struct ExpenseFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ExpenseFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExpenseFlowApi")
    }
}

impl<B> ExpenseFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> ExpenseFlowApi<B>
where B: LedgerDatabase
{
    /// Log a new expense against the group, with any per-member splits it carries.
    pub async fn create_expense(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        expense: NewExpense,
    ) -> Result<ExpenseWithSplits, ExpenseApiError> {
        group_id.validate()?;
        actor.validate()?;
        expense.paid_by_id.validate()?;
        for split in &expense.splits {
            split.user_id.validate()?;
        }
        let stored = self
            .db
            .insert_expense(group_id, expense)
            .await
            .map_err(|e| ExpenseApiError::StorageError(e.to_string()))?;
        debug!("🔄️🧾️ Expense {} created in group {group_id} by {actor}", stored.expense.id);
        self.call_expense_changed_hook(ExpenseChange::Created, actor, &stored.expense).await;
        self.refresh_settlements(group_id).await;
        Ok(stored)
    }

    /// Edit an expense's description and/or amount.
    pub async fn update_expense(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
        actor: &UserId,
        update: ExpenseUpdate,
    ) -> Result<Expense, ExpenseApiError> {
        group_id.validate()?;
        expense_id.validate()?;
        actor.validate()?;
        let expense = self
            .db
            .update_expense(group_id, expense_id, update)
            .await
            .map_err(|e| ExpenseApiError::StorageError(e.to_string()))?
            .ok_or_else(|| ExpenseApiError::ExpenseNotFound(expense_id.to_string()))?;
        debug!("🔄️🧾️ Expense {expense_id} updated in group {group_id} by {actor}");
        self.call_expense_changed_hook(ExpenseChange::Updated, actor, &expense).await;
        self.refresh_settlements(group_id).await;
        Ok(expense)
    }

    /// Delete an expense. Its splits are removed with it.
    pub async fn delete_expense(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
        actor: &UserId,
    ) -> Result<(), ExpenseApiError> {
        group_id.validate()?;
        expense_id.validate()?;
        actor.validate()?;
        let expense = self
            .db
            .fetch_expense(group_id, expense_id)
            .await
            .map_err(|e| ExpenseApiError::StorageError(e.to_string()))?
            .ok_or_else(|| ExpenseApiError::ExpenseNotFound(expense_id.to_string()))?;
        let deleted = self
            .db
            .delete_expense(group_id, expense_id)
            .await
            .map_err(|e| ExpenseApiError::StorageError(e.to_string()))?;
        if !deleted {
            return Err(ExpenseApiError::ExpenseNotFound(expense_id.to_string()));
        }
        debug!("🔄️🧾️ Expense {expense_id} deleted from group {group_id} by {actor}");
        self.call_expense_changed_hook(ExpenseChange::Deleted, actor, &expense.expense).await;
        self.refresh_settlements(group_id).await;
        Ok(())
    }

    pub async fn expense(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
    ) -> Result<Option<ExpenseWithSplits>, ExpenseApiError> {
        group_id.validate()?;
        expense_id.validate()?;
        self.db.fetch_expense(group_id, expense_id).await.map_err(|e| ExpenseApiError::StorageError(e.to_string()))
    }

    pub async fn group_expenses(&self, group_id: &GroupId) -> Result<Vec<ExpenseWithSplits>, ExpenseApiError> {
        group_id.validate()?;
        self.db.fetch_group_expenses(group_id).await.map_err(|e| ExpenseApiError::StorageError(e.to_string()))
    }

    /// Assign one member's share of an existing expense.
    pub async fn add_split(
        &self,
        group_id: &GroupId,
        expense_id: &ExpenseId,
        actor: &UserId,
        split: NewSplit,
    ) -> Result<ExpenseSplit, ExpenseApiError> {
        group_id.validate()?;
        expense_id.validate()?;
        actor.validate()?;
        split.user_id.validate()?;
        let stored = self
            .db
            .add_split(group_id, expense_id, split)
            .await
            .map_err(|e| ExpenseApiError::StorageError(e.to_string()))?
            .ok_or_else(|| ExpenseApiError::ExpenseNotFound(expense_id.to_string()))?;
        debug!("🔄️🧾️ Split {} added to expense {expense_id} by {actor}", stored.id);
        self.refresh_settlements(group_id).await;
        Ok(stored)
    }

    pub async fn update_split(
        &self,
        group_id: &GroupId,
        split_id: &SplitId,
        actor: &UserId,
        amount_owed: Money,
    ) -> Result<ExpenseSplit, ExpenseApiError> {
        group_id.validate()?;
        split_id.validate()?;
        actor.validate()?;
        let stored = self
            .db
            .update_split(split_id, amount_owed)
            .await
            .map_err(|e| ExpenseApiError::StorageError(e.to_string()))?
            .ok_or_else(|| ExpenseApiError::SplitNotFound(split_id.to_string()))?;
        debug!("🔄️🧾️ Split {split_id} updated by {actor}");
        self.refresh_settlements(group_id).await;
        Ok(stored)
    }

    pub async fn delete_split(
        &self,
        group_id: &GroupId,
        split_id: &SplitId,
        actor: &UserId,
    ) -> Result<(), ExpenseApiError> {
        group_id.validate()?;
        split_id.validate()?;
        actor.validate()?;
        let deleted =
            self.db.delete_split(split_id).await.map_err(|e| ExpenseApiError::StorageError(e.to_string()))?;
        if !deleted {
            return Err(ExpenseApiError::SplitNotFound(split_id.to_string()));
        }
        debug!("🔄️🧾️ Split {split_id} deleted by {actor}");
        self.refresh_settlements(group_id).await;
        Ok(())
    }

    /// The settlement recompute protocol.
    ///
    /// Reads a consistent ledger snapshot, folds it into balances, runs the greedy debt matcher, and replaces the
    /// group's pending settlements with the result in one transaction. Paid settlements are left untouched; they
    /// already participated in the fold as discharged transfers. Calling this twice without an intervening ledger
    /// change yields the same pending set.
    pub async fn recompute_settlements(&self, group_id: &GroupId) -> Result<Vec<Settlement>, ExpenseApiError> {
        group_id.validate()?;
        let ledger =
            self.db.fetch_group_ledger(group_id).await.map_err(|e| ExpenseApiError::StorageError(e.to_string()))?;
        let balances = accumulate_balances(&ledger.expenses, &ledger.paid_settlements);
        let transfers = match_debts(&balances)?;
        trace!("🔄️⚖️ Group {group_id}: {} balances collapsed into {} transfers", balances.len(), transfers.len());
        let pending = self
            .db
            .replace_pending_settlements(group_id, &transfers)
            .await
            .map_err(|e| ExpenseApiError::StorageError(e.to_string()))?;
        debug!("🔄️⚖️ Group {group_id} now has {} pending settlements", pending.len());
        self.call_settlements_recomputed_hook(group_id, &pending).await;
        Ok(pending)
    }

    /// Best-effort refresh after a ledger mutation. Failure is logged, never propagated: the mutation that
    /// triggered the refresh has already committed, and a stale pending set is recoverable on the next recompute.
    async fn refresh_settlements(&self, group_id: &GroupId) {
        if let Err(e) = self.recompute_settlements(group_id).await {
            warn!(
                "🔄️⚖️ Settlement recompute failed for group {group_id}: {e}. The pending set is stale until the \
                 next recompute."
            );
        }
    }

    async fn call_expense_changed_hook(&self, change: ExpenseChange, actor: &UserId, expense: &Expense) {
        for producer in &self.producers.expense_changed_producer {
            let event = ExpenseChangedEvent::new(change, actor.clone(), expense.clone());
            producer.publish_event(event).await;
        }
    }

    async fn call_settlements_recomputed_hook(&self, group_id: &GroupId, pending: &[Settlement]) {
        for producer in &self.producers.settlements_recomputed_producer {
            let event = SettlementsRecomputedEvent::new(group_id.clone(), pending.to_vec());
            producer.publish_event(event).await;
        }
    }
}
