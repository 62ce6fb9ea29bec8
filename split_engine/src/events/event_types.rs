use serde::{Deserialize, Serialize};

use crate::db_types::{Expense, GroupId, Settlement, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseChange {
    Created,
    Updated,
    Deleted,
}

/// Emitted after any expense or split mutation has been committed to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseChangedEvent {
    pub change: ExpenseChange,
    pub group_id: GroupId,
    /// The member who performed the mutation.
    pub actor: UserId,
    pub expense: Expense,
}

impl ExpenseChangedEvent {
    pub fn new(change: ExpenseChange, actor: UserId, expense: Expense) -> Self {
        let group_id = expense.group_id.clone();
        Self { change, group_id, actor, expense }
    }
}

/// Emitted after the recompute protocol has replaced a group's pending settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementsRecomputedEvent {
    pub group_id: GroupId,
    pub pending: Vec<Settlement>,
}

impl SettlementsRecomputedEvent {
    pub fn new(group_id: GroupId, pending: Vec<Settlement>) -> Self {
        Self { group_id, pending }
    }

    /// Every user that appears on either side of a pending transfer.
    pub fn participants(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = Vec::new();
        for settlement in &self.pending {
            for user in [&settlement.from_user_id, &settlement.to_user_id] {
                if !users.contains(user) {
                    users.push(user.clone());
                }
            }
        }
        users
    }
}

/// Emitted when a debtor marks one of their settlements as paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPaidEvent {
    pub settlement: Settlement,
}

impl SettlementPaidEvent {
    pub fn new(settlement: Settlement) -> Self {
        Self { settlement }
    }
}

/// The union of engine events, as delivered to per-user subscribers via the [`super::SubscriberRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    ExpenseChanged(ExpenseChangedEvent),
    SettlementsRecomputed(SettlementsRecomputedEvent),
    SettlementPaid(SettlementPaidEvent),
}
