use se_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::UserId,
    settlement::{Balances, SettlementError},
};

/// A directed transfer obligation produced by the matcher: `from_user_id` owes `to_user_id` the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Money,
}

struct Party {
    user_id: UserId,
    remaining: Money,
}

/// Collapses a balance set into a minimal list of directed transfers that zeroes every balance.
///
/// Debtors and creditors are taken in the order the accumulator discovered them, and matched with a greedy
/// two-pointer sweep: each step transfers `min(debtor.remaining, creditor.remaining)` and advances whichever side
/// reached exactly zero. The sweep emits at most `debtors + creditors - 1` transfers; each debtor pays out exactly
/// their debt and each creditor receives exactly their credit. No attempt is made to minimise the transfer count
/// across alternative orderings.
///
/// Total debt and total credit are compared exactly before the sweep starts. A mismatch means the stored ledger is
/// corrupt and the whole computation is rejected with [`SettlementError::UnbalancedLedger`].
pub fn match_debts(balances: &Balances) -> Result<Vec<Transfer>, SettlementError> {
    let mut debtors: Vec<Party> = balances
        .iter()
        .filter(|(_, b)| b.is_negative())
        .map(|(user_id, b)| Party { user_id: user_id.clone(), remaining: b.abs() })
        .collect();
    let mut creditors: Vec<Party> = balances
        .iter()
        .filter(|(_, b)| b.is_positive())
        .map(|(user_id, b)| Party { user_id: user_id.clone(), remaining: b })
        .collect();

    let debit: Money = debtors.iter().map(|p| p.remaining).sum();
    let credit: Money = creditors.iter().map(|p| p.remaining).sum();
    if debit != credit {
        return Err(SettlementError::UnbalancedLedger { debit, credit });
    }

    let mut transfers = Vec::new();
    let mut d = 0;
    let mut c = 0;
    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].remaining.min(creditors[c].remaining);
        if amount.is_positive() {
            transfers.push(Transfer {
                from_user_id: debtors[d].user_id.clone(),
                to_user_id: creditors[c].user_id.clone(),
                amount,
            });
        }
        debtors[d].remaining -= amount;
        creditors[c].remaining -= amount;
        if debtors[d].remaining.is_zero() {
            d += 1;
        }
        if creditors[c].remaining.is_zero() {
            c += 1;
        }
    }
    Ok(transfers)
}
