use se_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Settlement, UserId};

/// A user's view over their outstanding (pending) settlements: how much they are owed, how much they owe, and the
/// difference. Amounts are in minor units, like every other monetary value in the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub settlements: Vec<Settlement>,
    pub total_owed: Money,
    pub total_owing: Money,
    pub net_balance: Money,
}

impl SettlementSummary {
    /// Builds the summary from the pending settlements the user participates in.
    pub fn for_user(user_id: &UserId, settlements: Vec<Settlement>) -> Self {
        let mut total_owed = Money::ZERO;
        let mut total_owing = Money::ZERO;
        for settlement in &settlements {
            if &settlement.from_user_id == user_id {
                total_owing += settlement.amount;
            } else {
                total_owed += settlement.amount;
            }
        }
        Self { settlements, total_owed, total_owing, net_balance: total_owed - total_owing }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{GroupId, SettlementId, SettlementStatus};

    fn pending(from: &str, to: &str, cents: i64) -> Settlement {
        Settlement {
            id: SettlementId::random(),
            group_id: GroupId("g1".to_string()),
            from_user_id: UserId(from.to_string()),
            to_user_id: UserId(to.to_string()),
            amount: Money::from_cents(cents),
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn totals_split_by_direction() {
        let user = UserId("alice".to_string());
        let summary = SettlementSummary::for_user(&user, vec![
            pending("bob", "alice", 1500),
            pending("alice", "carol", 400),
            pending("dave", "alice", 100),
        ]);
        assert_eq!(summary.total_owed, Money::from_cents(1600));
        assert_eq!(summary.total_owing, Money::from_cents(400));
        assert_eq!(summary.net_balance, Money::from_cents(1200));
    }

    #[test]
    fn empty_summary_is_zero() {
        let summary = SettlementSummary::for_user(&UserId("alice".to_string()), vec![]);
        assert!(summary.total_owed.is_zero());
        assert!(summary.total_owing.is_zero());
        assert!(summary.net_balance.is_zero());
    }
}
