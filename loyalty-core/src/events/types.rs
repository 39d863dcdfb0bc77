//! Reconciliation queue messages.

use crate::accrual::{AccrualError, AccrualResponse};
use crate::entities::processing_claims::ClaimedOrder;
use crate::entities::settlement::ResolvedAccrual;
use uuid::Uuid;

/// Ask a worker to resolve one claimed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualRequest {
    pub order_id: String,
    pub user_id: Uuid,
}

impl From<ClaimedOrder> for AccrualRequest {
    fn from(order: ClaimedOrder) -> Self {
        Self {
            order_id: order.order_id,
            user_id: order.user_id,
        }
    }
}

/// The single answer a worker emits for every request it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualResult {
    pub order_id: String,
    pub user_id: Uuid,
    pub outcome: Result<AccrualResponse, AccrualError>,
}

impl AccrualResult {
    pub fn new(request: AccrualRequest, outcome: Result<AccrualResponse, AccrualError>) -> Self {
        Self {
            order_id: request.order_id,
            user_id: request.user_id,
            outcome,
        }
    }

    /// The settlement input, or the error that kept this order unresolved.
    pub fn into_resolved(self) -> Result<ResolvedAccrual, (String, AccrualError)> {
        match self.outcome {
            Ok(response) => Ok(ResolvedAccrual {
                order_id: self.order_id,
                user_id: self.user_id,
                status: response.status,
                accrual: response.accrual,
            }),
            Err(err) => Err((self.order_id, err)),
        }
    }
}
