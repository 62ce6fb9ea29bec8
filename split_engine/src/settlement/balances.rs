use std::collections::HashMap;

use se_common::Money;

use crate::db_types::{ExpenseWithSplits, Settlement, UserId};

/// Signed balance per user, in the order each user was first seen while folding the ledger.
///
/// Positive means the user is a net creditor (owed money); negative means a net debtor. The insertion order is what
/// makes the debt matcher deterministic, so it is preserved explicitly rather than left to hash-map iteration.
#[derive(Debug, Clone, Default)]
pub struct Balances {
    entries: Vec<(UserId, Money)>,
    index: HashMap<UserId, usize>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, user: &UserId) -> &mut Money {
        let i = match self.index.get(user) {
            Some(&i) => i,
            None => {
                self.entries.push((user.clone(), Money::ZERO));
                self.index.insert(user.clone(), self.entries.len() - 1);
                self.entries.len() - 1
            },
        };
        &mut self.entries[i].1
    }

    pub fn credit(&mut self, user: &UserId, amount: Money) {
        *self.entry_mut(user) += amount;
    }

    pub fn debit(&mut self, user: &UserId, amount: Money) {
        *self.entry_mut(user) -= amount;
    }

    pub fn get(&self, user: &UserId) -> Option<Money> {
        self.index.get(user).map(|&i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, Money)> {
        self.entries.iter().map(|(u, b)| (u, *b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all balances. Zero for any ledger folded through [`accumulate_balances`].
    pub fn total(&self) -> Money {
        self.entries.iter().map(|(_, b)| *b).sum()
    }
}

/// Folds a group's expenses (with their splits) and its PAID settlements into one signed balance per user.
///
/// * The payer of an expense is credited its full amount; each split debits that member's share.
/// * A paid settlement credits the debtor (their obligation is discharged) and debits the creditor (their claim is
///   reduced), which is why paid settlements must never be deleted or regenerated.
///
/// Users that appear nowhere in the ledger do not appear in the output. Referential integrity is not checked here;
/// the schema constraints of the backing store own that invariant, and split values are trusted as given.
pub fn accumulate_balances(expenses: &[ExpenseWithSplits], paid_settlements: &[Settlement]) -> Balances {
    let mut balances = Balances::new();
    for entry in expenses {
        balances.credit(&entry.expense.paid_by_id, entry.expense.amount);
        for split in &entry.splits {
            balances.debit(&split.user_id, split.amount_owed);
        }
    }
    for settlement in paid_settlements {
        balances.credit(&settlement.from_user_id, settlement.amount);
        balances.debit(&settlement.to_user_id, settlement.amount);
    }
    balances
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use se_common::Money;

    use super::*;
    use crate::db_types::{Expense, ExpenseId, ExpenseSplit, GroupId, SettlementId, SettlementStatus, SplitId};

    fn uid(s: &str) -> UserId {
        UserId(s.to_string())
    }

    fn expense(paid_by: &str, amount: i64, splits: &[(&str, i64)]) -> ExpenseWithSplits {
        let id = ExpenseId::random();
        ExpenseWithSplits {
            expense: Expense {
                id: id.clone(),
                group_id: GroupId("g1".to_string()),
                paid_by_id: uid(paid_by),
                description: "test".to_string(),
                amount: Money::from_cents(amount),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            splits: splits
                .iter()
                .map(|(user, owed)| ExpenseSplit {
                    id: SplitId::random(),
                    expense_id: id.clone(),
                    user_id: uid(user),
                    amount_owed: Money::from_cents(*owed),
                })
                .collect(),
        }
    }

    fn paid_settlement(from: &str, to: &str, amount: i64) -> Settlement {
        Settlement {
            id: SettlementId::random(),
            group_id: GroupId("g1".to_string()),
            from_user_id: uid(from),
            to_user_id: uid(to),
            amount: Money::from_cents(amount),
            status: SettlementStatus::Paid,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_ledger_has_no_balances() {
        let balances = accumulate_balances(&[], &[]);
        assert!(balances.is_empty());
        assert!(balances.total().is_zero());
    }

    #[test]
    fn single_expense_even_split() {
        // A pays $30, split evenly between A and B
        let ledger = vec![expense("alice", 3000, &[("alice", 1500), ("bob", 1500)])];
        let balances = accumulate_balances(&ledger, &[]);
        assert_eq!(balances.get(&uid("alice")), Some(Money::from_cents(1500)));
        assert_eq!(balances.get(&uid("bob")), Some(Money::from_cents(-1500)));
        assert!(balances.total().is_zero());
    }

    #[test]
    fn cross_expenses_net_out() {
        // Scenario B from the service's acceptance list: A pays $30 split evenly, B pays $15 split evenly.
        let ledger = vec![
            expense("alice", 3000, &[("alice", 1500), ("bob", 1500)]),
            expense("bob", 1500, &[("bob", 750), ("alice", 750)]),
        ];
        let balances = accumulate_balances(&ledger, &[]);
        assert_eq!(balances.get(&uid("alice")), Some(Money::from_cents(750)));
        assert_eq!(balances.get(&uid("bob")), Some(Money::from_cents(-750)));
    }

    #[test]
    fn paid_settlement_discharges_debt() {
        let ledger = vec![expense("alice", 3000, &[("alice", 1500), ("bob", 1500)])];
        let paid = vec![paid_settlement("bob", "alice", 1500)];
        let balances = accumulate_balances(&ledger, &paid);
        assert_eq!(balances.get(&uid("alice")), Some(Money::ZERO));
        assert_eq!(balances.get(&uid("bob")), Some(Money::ZERO));
    }

    #[test]
    fn settlement_only_users_get_balances() {
        // A paid settlement referencing users with no expenses still produces balance entries for them.
        let paid = vec![paid_settlement("carol", "dave", 500)];
        let balances = accumulate_balances(&[], &paid);
        assert_eq!(balances.get(&uid("carol")), Some(Money::from_cents(500)));
        assert_eq!(balances.get(&uid("dave")), Some(Money::from_cents(-500)));
    }

    #[test]
    fn insertion_order_follows_ledger_discovery() {
        let ledger = vec![
            expense("carol", 900, &[("alice", 300), ("bob", 300), ("carol", 300)]),
            expense("alice", 100, &[("bob", 100)]),
        ];
        let balances = accumulate_balances(&ledger, &[]);
        let order: Vec<&str> = balances.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(order, vec!["carol", "alice", "bob"]);
    }

    #[test]
    fn zero_sum_holds_for_uneven_splits() {
        // Splits are trusted as given, even when they do not add up to the expense amount. The books still balance
        // in the sense that accumulation is a pure fold; the total reflects whatever the splits say.
        let ledger = vec![expense("alice", 1000, &[("bob", 400), ("carol", 600)])];
        let balances = accumulate_balances(&ledger, &[]);
        assert!(balances.total().is_zero());
        assert_eq!(balances.get(&uid("alice")), Some(Money::from_cents(1000)));
    }
}
