use crate::accrual::AccrualStatus;
use crate::entities::OrderStatus;
use crate::entities::balances::Balance;
use crate::entities::orders::OrderRecord;
use crate::entities::processing_claims::ProcessingClaim;
use crate::framework::DatabaseProcessor;
use crate::utils::ClaimOwner;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A successful oracle answer for one claimed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccrual {
    pub order_id: String,
    pub user_id: Uuid,
    pub status: AccrualStatus,
    pub accrual: Option<Decimal>,
}

/// What settling one resolved accrual does to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementAction {
    /// Write a terminal status and credit `credit` points to the owner.
    Finalize {
        status: OrderStatus,
        accrual: Option<Decimal>,
        credit: Decimal,
    },
    /// The oracle is still working on it; keep the order queued.
    KeepPending,
}

impl ResolvedAccrual {
    pub fn action(&self) -> SettlementAction {
        match self.status {
            AccrualStatus::Processed => {
                let accrual = self.accrual.unwrap_or(Decimal::ZERO);
                SettlementAction::Finalize {
                    status: OrderStatus::Processed,
                    accrual: Some(accrual),
                    credit: accrual,
                }
            }
            AccrualStatus::Invalid => SettlementAction::Finalize {
                status: OrderStatus::Invalid,
                accrual: None,
                credit: Decimal::ZERO,
            },
            AccrualStatus::Registered | AccrualStatus::Processing => SettlementAction::KeepPending,
        }
    }
}

/// Counts of what one settlement applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementSummary {
    pub processed: u64,
    pub invalid: u64,
    pub pending: u64,
    /// Results for orders that were already terminal; nothing was applied.
    pub already_final: u64,
}

impl SettlementSummary {
    pub fn record(&mut self, action: &SettlementAction, applied: bool) {
        match action {
            SettlementAction::Finalize { .. } if !applied => self.already_final += 1,
            SettlementAction::Finalize {
                status: OrderStatus::Processed,
                ..
            } => self.processed += 1,
            SettlementAction::Finalize { .. } => self.invalid += 1,
            SettlementAction::KeepPending => self.pending += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.processed + self.invalid + self.pending + self.already_final
    }
}

#[derive(Debug, Clone)]
/// Apply a batch of resolved accruals in a single transaction.
///
/// Terminal results update the order, credit points once and drop the
/// claim. Non-terminal results move `NEW` to `PROCESSING` and re-stamp the
/// claim. Either the whole batch lands or none of it.
pub struct SettleBatch {
    pub owner: ClaimOwner,
    pub results: Vec<ResolvedAccrual>,
}

impl Processor<SettleBatch> for DatabaseProcessor {
    type Output = SettlementSummary;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SettleBatch")]
    async fn process(&self, cmd: SettleBatch) -> Result<SettlementSummary, sqlx::Error> {
        let mut summary = SettlementSummary::default();
        if cmd.results.is_empty() {
            return Ok(summary);
        }

        let mut tx = self.pool.begin().await?;
        for result in &cmd.results {
            let action = result.action();
            let applied = match action {
                SettlementAction::Finalize {
                    status,
                    accrual,
                    credit,
                } => {
                    let owner =
                        OrderRecord::finalize_tx(&mut tx, &result.order_id, status, accrual)
                            .await?;
                    if let Some(user_id) = owner {
                        if credit > Decimal::ZERO {
                            Balance::credit_tx(&mut tx, user_id, credit).await?;
                        }
                    }
                    ProcessingClaim::delete_tx(&mut tx, &result.order_id).await?;
                    owner.is_some()
                }
                SettlementAction::KeepPending => {
                    OrderRecord::mark_processing_tx(&mut tx, &result.order_id).await?;
                    ProcessingClaim::touch_tx(&mut tx, &result.order_id, &cmd.owner).await?;
                    true
                }
            };
            summary.record(&action, applied);
        }
        tx.commit().await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(status: AccrualStatus, accrual: Option<Decimal>) -> ResolvedAccrual {
        ResolvedAccrual {
            order_id: "79927398713".to_string(),
            user_id: Uuid::nil(),
            status,
            accrual,
        }
    }

    #[test]
    fn test_processed_credits_accrual() {
        let action = resolved(AccrualStatus::Processed, Some(Decimal::new(7295, 1))).action();
        assert_eq!(
            action,
            SettlementAction::Finalize {
                status: OrderStatus::Processed,
                accrual: Some(Decimal::new(7295, 1)),
                credit: Decimal::new(7295, 1),
            }
        );
    }

    #[test]
    fn test_processed_without_accrual_credits_nothing() {
        let action = resolved(AccrualStatus::Processed, None).action();
        assert_eq!(
            action,
            SettlementAction::Finalize {
                status: OrderStatus::Processed,
                accrual: Some(Decimal::ZERO),
                credit: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn test_invalid_ignores_accrual() {
        let action = resolved(AccrualStatus::Invalid, Some(Decimal::ONE)).action();
        assert_eq!(
            action,
            SettlementAction::Finalize {
                status: OrderStatus::Invalid,
                accrual: None,
                credit: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn test_oracle_progress_keeps_order_pending() {
        assert_eq!(
            resolved(AccrualStatus::Registered, None).action(),
            SettlementAction::KeepPending
        );
        assert_eq!(
            resolved(AccrualStatus::Processing, None).action(),
            SettlementAction::KeepPending
        );
    }

    mod postgres {
        use super::*;
        use crate::entities::balances::GetBalance;
        use crate::entities::orders::{CreateOrder, GetUserOrders};
        use crate::entities::processing_claims::ClaimOrdersForProcessing;
        use crate::framework::testing::{create_user, isolated_processor};

        async fn queue_and_claim(
            processor: &DatabaseProcessor,
            user_id: Uuid,
            order_id: &str,
            owner: &ClaimOwner,
        ) {
            processor
                .process(CreateOrder {
                    order_id: order_id.to_string(),
                    user_id,
                })
                .await
                .unwrap();
            let claimed = processor
                .process(ClaimOrdersForProcessing {
                    owner: owner.clone(),
                    limit: 10,
                })
                .await
                .unwrap();
            assert_eq!(claimed.len(), 1);
        }

        fn answer(
            order_id: &str,
            user_id: Uuid,
            status: AccrualStatus,
            accrual: i64,
        ) -> ResolvedAccrual {
            ResolvedAccrual {
                order_id: order_id.to_string(),
                user_id,
                status,
                accrual: Some(Decimal::from(accrual)),
            }
        }

        #[tokio::test]
        #[ignore = "requires Postgres at DATABASE_URL"]
        async fn test_settle_batch_credits_once() {
            let processor = isolated_processor().await;
            let user_id = create_user(&processor, "alice").await;
            let owner = ClaimOwner::from("owner");
            queue_and_claim(&processor, user_id, "12345678903", &owner).await;

            let result = answer("12345678903", user_id, AccrualStatus::Processed, 500);
            let settle = || SettleBatch {
                owner: owner.clone(),
                results: vec![result.clone()],
            };
            let summary = processor.process(settle()).await.unwrap();
            assert_eq!(summary.processed, 1);
            let again = processor.process(settle()).await.unwrap();
            assert_eq!(again.already_final, 1);
            assert_eq!(again.processed, 0);

            let balance = processor.process(GetBalance { user_id }).await.unwrap().unwrap();
            assert_eq!(balance.current, Decimal::from(500));
            let orders = processor.process(GetUserOrders { user_id }).await.unwrap();
            assert_eq!(orders[0].status, OrderStatus::Processed);
            assert_eq!(orders[0].accrual, Some(Decimal::from(500)));

            let requeued = processor
                .process(ClaimOrdersForProcessing {
                    owner: ClaimOwner::from("other"),
                    limit: 10,
                })
                .await
                .unwrap();
            assert!(requeued.is_empty());
        }

        #[tokio::test]
        #[ignore = "requires Postgres at DATABASE_URL"]
        async fn test_pending_answer_keeps_claim() {
            let processor = isolated_processor().await;
            let user_id = create_user(&processor, "alice").await;
            let owner = ClaimOwner::from("owner");
            queue_and_claim(&processor, user_id, "79927398713", &owner).await;

            let summary = processor
                .process(SettleBatch {
                    owner: owner.clone(),
                    results: vec![answer("79927398713", user_id, AccrualStatus::Processing, 0)],
                })
                .await
                .unwrap();
            assert_eq!(summary.pending, 1);

            let orders = processor.process(GetUserOrders { user_id }).await.unwrap();
            assert_eq!(orders[0].status, OrderStatus::Processing);
            assert_eq!(orders[0].accrual, None);
            let balance = processor.process(GetBalance { user_id }).await.unwrap().unwrap();
            assert_eq!(balance.current, Decimal::ZERO);
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = SettlementSummary::default();
        let processed = resolved(AccrualStatus::Processed, Some(Decimal::TEN)).action();
        let invalid = resolved(AccrualStatus::Invalid, None).action();
        summary.record(&processed, true);
        summary.record(&processed, false);
        summary.record(&invalid, true);
        summary.record(&SettlementAction::KeepPending, true);
        assert_eq!(
            summary,
            SettlementSummary {
                processed: 1,
                invalid: 1,
                pending: 1,
                already_final: 1,
            }
        );
        assert_eq!(summary.total(), 4);
    }
}
