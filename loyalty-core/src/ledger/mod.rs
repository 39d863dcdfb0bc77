//! The points ledger: users, orders, balances, withdrawals and the
//! processing-claim queue that drives reconciliation.
//!
//! [`LedgerStore`] is the storage seam. [`DatabaseProcessor`] implements it
//! on Postgres; [`MemoryLedger`] implements the same contract in memory.
//!
//! [`DatabaseProcessor`]: crate::framework::DatabaseProcessor

mod memory;
mod postgres;

pub use memory::MemoryLedger;

use crate::entities::balances::Balance;
use crate::entities::orders::{OrderInsertOutcome, OrderRecord};
use crate::entities::processing_claims::ClaimedOrder;
use crate::entities::settlement::{ResolvedAccrual, SettlementSummary};
use crate::entities::users::UserRecord;
use crate::entities::withdrawals::{DebitOutcome, WithdrawalRecord};
use crate::utils::{ClaimOwner, LuhnError, validate_order_number};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ledger operation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Durable state of the loyalty system.
///
/// Every mutating operation is atomic. Implementations must keep two
/// guarantees under concurrency: a balance never goes negative, and an
/// order is held by at most one live claim owner.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Register a login; `None` when it is taken.
    async fn create_user(&self, login: &str, password_hash: &str)
    -> Result<Option<Uuid>, LedgerError>;

    async fn get_user_by_login(&self, login: &str) -> Result<Option<UserRecord>, LedgerError>;

    /// Insert a new order and its claim, or report who already owns it.
    async fn create_order(
        &self,
        order_id: &str,
        user_id: Uuid,
    ) -> Result<OrderInsertOutcome, LedgerError>;

    /// Orders of a user, newest first.
    async fn get_user_orders(&self, user_id: Uuid) -> Result<Vec<OrderRecord>, LedgerError>;

    async fn get_balance(&self, user_id: Uuid) -> Result<Balance, LedgerError>;

    async fn withdraw(
        &self,
        user_id: Uuid,
        order_id: &str,
        amount: Decimal,
    ) -> Result<DebitOutcome, LedgerError>;

    /// Withdrawals of a user, newest first.
    async fn get_user_withdrawals(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WithdrawalRecord>, LedgerError>;

    /// Lease up to `limit` free claims to `owner`.
    ///
    /// A claim owned by anyone, this owner included, is never returned.
    async fn claim_orders_for_processing(
        &self,
        owner: &ClaimOwner,
        limit: usize,
    ) -> Result<Vec<ClaimedOrder>, LedgerError>;

    /// Free every claim held by `owner`.
    async fn release_claims_of(&self, owner: &ClaimOwner) -> Result<u64, LedgerError>;

    /// Free claims of any owner older than `stale_after`.
    async fn recover_crashed_claims(&self, stale_after: Duration) -> Result<u64, LedgerError>;

    /// Apply resolved accruals atomically.
    async fn settle_batch(
        &self,
        owner: &ClaimOwner,
        results: Vec<ResolvedAccrual>,
    ) -> Result<SettlementSummary, LedgerError>;
}

/// Result of a user submitting an order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    AlreadyOwned,
    OwnedByAnotherUser,
    InvalidNumber(LuhnError),
}

impl From<OrderInsertOutcome> for SubmitOutcome {
    fn from(value: OrderInsertOutcome) -> Self {
        match value {
            OrderInsertOutcome::Created => SubmitOutcome::Created,
            OrderInsertOutcome::AlreadyOwned => SubmitOutcome::AlreadyOwned,
            OrderInsertOutcome::OwnedByAnotherUser => SubmitOutcome::OwnedByAnotherUser,
        }
    }
}

/// Result of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Withdrawn,
    InsufficientFunds,
    DuplicateDebit,
    InvalidNumber(LuhnError),
    /// Zero or negative sums are never debited.
    InvalidAmount,
}

impl From<DebitOutcome> for WithdrawOutcome {
    fn from(value: DebitOutcome) -> Self {
        match value {
            DebitOutcome::Withdrawn => WithdrawOutcome::Withdrawn,
            DebitOutcome::InsufficientFunds => WithdrawOutcome::InsufficientFunds,
            DebitOutcome::DuplicateDebit => WithdrawOutcome::DuplicateDebit,
        }
    }
}

/// Validate and record an order number for `user_id`.
pub async fn submit_order(
    ledger: &dyn LedgerStore,
    user_id: Uuid,
    order_id: &str,
) -> Result<SubmitOutcome, LedgerError> {
    if let Err(err) = validate_order_number(order_id) {
        return Ok(SubmitOutcome::InvalidNumber(err));
    }
    let outcome = ledger.create_order(order_id, user_id).await?;
    Ok(outcome.into())
}

/// Validate and perform a withdrawal of `amount` against `order_id`.
pub async fn withdraw(
    ledger: &dyn LedgerStore,
    user_id: Uuid,
    order_id: &str,
    amount: Decimal,
) -> Result<WithdrawOutcome, LedgerError> {
    if let Err(err) = validate_order_number(order_id) {
        return Ok(WithdrawOutcome::InvalidNumber(err));
    }
    if amount <= Decimal::ZERO {
        return Ok(WithdrawOutcome::InvalidAmount);
    }
    let outcome = ledger.withdraw(user_id, order_id, amount).await?;
    Ok(outcome.into())
}
