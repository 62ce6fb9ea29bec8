use se_common::Money;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    /// Total debt and total credit disagree after accumulation. With exact arithmetic this can only happen when the
    /// stored ledger itself is corrupt, so the computation is aborted outright. Truncating the transfer list instead
    /// would misstate who owes what.
    #[error("Ledger is unbalanced: total debt {debit} != total credit {credit}")]
    UnbalancedLedger { debit: Money, credit: Money },
}
