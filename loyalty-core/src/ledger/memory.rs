use super::{LedgerError, LedgerStore};
use crate::entities::OrderStatus;
use crate::entities::balances::Balance;
use crate::entities::orders::{OrderInsertOutcome, OrderRecord};
use crate::entities::processing_claims::{ClaimedOrder, ProcessingClaim};
use crate::entities::settlement::{ResolvedAccrual, SettlementAction, SettlementSummary};
use crate::entities::users::UserRecord;
use crate::entities::withdrawals::{DebitOutcome, WithdrawalRecord};
use crate::utils::ClaimOwner;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process [`LedgerStore`] with the same semantics as the Postgres one.
///
/// All state sits behind one lock, so every operation is trivially atomic.
/// The clock can be moved forward to exercise crash recovery.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserRecord>,
    balances: HashMap<Uuid, Balance>,
    orders: HashMap<String, OrderRecord>,
    claims: HashMap<String, ProcessingClaim>,
    withdrawals: HashMap<String, WithdrawalRecord>,
    clock_offset: Duration,
}

impl MemoryState {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + self.clock_offset
    }

    fn settle_one(&mut self, owner: &ClaimOwner, result: &ResolvedAccrual) -> (SettlementAction, bool) {
        let action = result.action();
        let applied = match action {
            SettlementAction::Finalize {
                status,
                accrual,
                credit,
            } => {
                let mut credited_user = None;
                if let Some(order) = self.orders.get_mut(&result.order_id) {
                    if !order.status.is_terminal() {
                        order.status = status;
                        order.accrual = accrual;
                        credited_user = Some(order.user_id);
                    }
                }
                if let Some(user_id) = credited_user {
                    if credit > Decimal::ZERO {
                        if let Some(balance) = self.balances.get_mut(&user_id) {
                            balance.current += credit;
                        }
                    }
                }
                self.claims.remove(&result.order_id);
                credited_user.is_some()
            }
            SettlementAction::KeepPending => {
                if let Some(order) = self.orders.get_mut(&result.order_id) {
                    if order.status == OrderStatus::New {
                        order.status = OrderStatus::Processing;
                    }
                }
                let now = self.now();
                if let Some(claim) = self.claims.get_mut(&result.order_id) {
                    if claim.claim_owner.as_deref() == Some(owner.as_str()) {
                        claim.updated_at = now;
                    }
                }
                true
            }
        };
        (action, applied)
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift this ledger's notion of "now" forward.
    pub async fn advance_clock(&self, by: Duration) {
        self.state.lock().await.clock_offset += by;
    }

    /// Current claim row of an order, if it is still queued.
    pub async fn claim_of(&self, order_id: &str) -> Option<ProcessingClaim> {
        self.state.lock().await.claims.get(order_id).cloned()
    }

    /// Add points directly, bypassing reconciliation.
    pub async fn credit(&self, user_id: Uuid, amount: Decimal) {
        let mut state = self.state.lock().await;
        state.balances.entry(user_id).or_default().current += amount;
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
    ) -> Result<Option<Uuid>, LedgerError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|user| user.login == login) {
            return Ok(None);
        }
        let user_id = Uuid::now_v7();
        let created_at = state.now();
        state.users.insert(
            user_id,
            UserRecord {
                user_id,
                login: login.to_string(),
                password_hash: password_hash.to_string(),
                created_at,
            },
        );
        state.balances.insert(user_id, Balance::default());
        Ok(Some(user_id))
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<UserRecord>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|user| user.login == login).cloned())
    }

    async fn create_order(
        &self,
        order_id: &str,
        user_id: Uuid,
    ) -> Result<OrderInsertOutcome, LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.orders.get(order_id) {
            return Ok(if existing.user_id == user_id {
                OrderInsertOutcome::AlreadyOwned
            } else {
                OrderInsertOutcome::OwnedByAnotherUser
            });
        }
        let now = state.now();
        state.orders.insert(
            order_id.to_string(),
            OrderRecord {
                order_id: order_id.to_string(),
                user_id,
                status: OrderStatus::New,
                accrual: None,
                uploaded_at: now,
            },
        );
        state.claims.insert(
            order_id.to_string(),
            ProcessingClaim {
                order_id: order_id.to_string(),
                user_id,
                claim_owner: None,
                claimed_at: None,
                updated_at: now,
            },
        );
        Ok(OrderInsertOutcome::Created)
    }

    async fn get_user_orders(&self, user_id: Uuid) -> Result<Vec<OrderRecord>, LedgerError> {
        let state = self.state.lock().await;
        let mut orders: Vec<OrderRecord> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Ok(orders)
    }

    async fn get_balance(&self, user_id: Uuid) -> Result<Balance, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.balances.get(&user_id).copied().unwrap_or_default())
    }

    async fn withdraw(
        &self,
        user_id: Uuid,
        order_id: &str,
        amount: Decimal,
    ) -> Result<DebitOutcome, LedgerError> {
        let mut state = self.state.lock().await;
        if state.withdrawals.contains_key(order_id) {
            return Ok(DebitOutcome::DuplicateDebit);
        }
        let Some(balance) = state.balances.get_mut(&user_id) else {
            return Ok(DebitOutcome::InsufficientFunds);
        };
        if balance.current < amount {
            return Ok(DebitOutcome::InsufficientFunds);
        }
        balance.current -= amount;
        balance.withdrawn += amount;

        let processed_at = state.now();
        state.withdrawals.insert(
            order_id.to_string(),
            WithdrawalRecord {
                order_id: order_id.to_string(),
                user_id,
                amount,
                processed_at,
            },
        );
        Ok(DebitOutcome::Withdrawn)
    }

    async fn get_user_withdrawals(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WithdrawalRecord>, LedgerError> {
        let state = self.state.lock().await;
        let mut withdrawals: Vec<WithdrawalRecord> = state
            .withdrawals
            .values()
            .filter(|withdrawal| withdrawal.user_id == user_id)
            .cloned()
            .collect();
        withdrawals.sort_by(|a, b| {
            b.processed_at
                .cmp(&a.processed_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Ok(withdrawals)
    }

    async fn claim_orders_for_processing(
        &self,
        owner: &ClaimOwner,
        limit: usize,
    ) -> Result<Vec<ClaimedOrder>, LedgerError> {
        let mut state = self.state.lock().await;
        let now = state.now();

        let mut claimable: Vec<(OffsetDateTime, String)> = state
            .claims
            .values()
            .filter(|claim| claim.claim_owner.is_none())
            .map(|claim| (claim.updated_at, claim.order_id.clone()))
            .collect();
        claimable.sort();
        claimable.truncate(limit);

        let mut claimed = Vec::with_capacity(claimable.len());
        for (_, order_id) in claimable {
            if let Some(claim) = state.claims.get_mut(&order_id) {
                claim.claim_owner = Some(owner.as_str().to_string());
                claim.claimed_at = Some(now);
                claim.updated_at = now;
                claimed.push(ClaimedOrder {
                    order_id: claim.order_id.clone(),
                    user_id: claim.user_id,
                });
            }
        }
        Ok(claimed)
    }

    async fn release_claims_of(&self, owner: &ClaimOwner) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().await;
        let mut released = 0;
        for claim in state.claims.values_mut() {
            if claim.claim_owner.as_deref() == Some(owner.as_str()) {
                claim.claim_owner = None;
                claim.claimed_at = None;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn recover_crashed_claims(&self, stale_after: Duration) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().await;
        let stale_before = state.now() - stale_after;
        let mut recovered = 0;
        for claim in state.claims.values_mut() {
            let stale = claim.claim_owner.is_some()
                && claim
                    .claimed_at
                    .is_some_and(|claimed_at| claimed_at < stale_before);
            if stale {
                claim.claim_owner = None;
                claim.claimed_at = None;
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    async fn settle_batch(
        &self,
        owner: &ClaimOwner,
        results: Vec<ResolvedAccrual>,
    ) -> Result<SettlementSummary, LedgerError> {
        let mut state = self.state.lock().await;
        let mut summary = SettlementSummary::default();
        for result in &results {
            let (action, applied) = state.settle_one(owner, result);
            summary.record(&action, applied);
        }
        Ok(summary)
    }
}
