use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::LedgerDatabase,
    db_types::{GroupId, Settlement, SettlementId, SettlementStatus, UserId},
    events::{EventProducers, SettlementPaidEvent},
    sfe_api::{errors::SettlementApiError, settlement_objects::SettlementSummary},
};

/// `SettlementApi` provides the read side of settlement state plus the one legal write: the debtor marking their own
/// pending settlement as paid.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> SettlementApi<B>
where B: LedgerDatabase
{
    /// Every settlement of the group, optionally filtered by status, newest first.
    pub async fn group_settlements(
        &self,
        group_id: &GroupId,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, SettlementApiError> {
        group_id.validate()?;
        self.db.fetch_settlements(group_id, status).await.map_err(|e| SettlementApiError::StorageError(e.to_string()))
    }

    /// A single settlement, visible only to the two users it involves.
    pub async fn settlement_detail(
        &self,
        settlement_id: &SettlementId,
        requester: &UserId,
    ) -> Result<Settlement, SettlementApiError> {
        settlement_id.validate()?;
        requester.validate()?;
        let settlement = self
            .db
            .fetch_settlement(settlement_id)
            .await
            .map_err(|e| SettlementApiError::StorageError(e.to_string()))?
            .ok_or_else(|| SettlementApiError::SettlementNotFound(settlement_id.to_string()))?;
        if &settlement.from_user_id != requester && &settlement.to_user_id != requester {
            return Err(SettlementApiError::NotAParticipant);
        }
        Ok(settlement)
    }

    /// The debtor marks their settlement as paid. The transition is PENDING→PAID, exactly once; afterwards the row
    /// is a historical fact that future recomputes fold in as a discharged transfer instead of regenerating it.
    /// Callers that want the remaining pending set to net the payment out immediately follow this with a recompute
    /// ([`crate::ExpenseFlowApi::recompute_settlements`]).
    pub async fn mark_paid(
        &self,
        settlement_id: &SettlementId,
        requester: &UserId,
    ) -> Result<Settlement, SettlementApiError> {
        settlement_id.validate()?;
        requester.validate()?;
        let settlement = self
            .db
            .fetch_settlement(settlement_id)
            .await
            .map_err(|e| SettlementApiError::StorageError(e.to_string()))?
            .ok_or_else(|| SettlementApiError::SettlementNotFound(settlement_id.to_string()))?;
        if &settlement.from_user_id != requester {
            return Err(SettlementApiError::NotYourDebt);
        }
        if settlement.status == SettlementStatus::Paid {
            return Err(SettlementApiError::AlreadyPaid);
        }
        let paid = self
            .db
            .mark_settlement_paid(settlement_id, requester)
            .await
            .map_err(|e| SettlementApiError::StorageError(e.to_string()))?
            // The guarded update matched nothing: the row stopped being pending between our read and the write.
            .ok_or(SettlementApiError::AlreadyPaid)?;
        debug!("🔄️💸️ Settlement {settlement_id} marked as paid by {requester}");
        self.call_settlement_paid_hook(&paid).await;
        Ok(paid)
    }

    /// Sums the user's pending settlements into what they are owed, what they owe, and the net, optionally scoped
    /// to one group. Only PENDING rows participate; paid settlements are history.
    pub async fn user_settlement_summary(
        &self,
        user_id: &UserId,
        group_id: Option<&GroupId>,
    ) -> Result<SettlementSummary, SettlementApiError> {
        user_id.validate()?;
        if let Some(group_id) = group_id {
            group_id.validate()?;
        }
        let settlements = self
            .db
            .fetch_settlements_for_user(user_id, group_id, Some(SettlementStatus::Pending))
            .await
            .map_err(|e| SettlementApiError::StorageError(e.to_string()))?;
        Ok(SettlementSummary::for_user(user_id, settlements))
    }

    /// Settlements the user participates in across all their groups, any status, newest first.
    pub async fn user_settlements(&self, user_id: &UserId) -> Result<Vec<Settlement>, SettlementApiError> {
        user_id.validate()?;
        self.db
            .fetch_settlements_for_user(user_id, None, None)
            .await
            .map_err(|e| SettlementApiError::StorageError(e.to_string()))
    }

    async fn call_settlement_paid_hook(&self, settlement: &Settlement) {
        for producer in &self.producers.settlement_paid_producer {
            let event = SettlementPaidEvent::new(settlement.clone());
            producer.publish_event(event).await;
        }
    }
}
