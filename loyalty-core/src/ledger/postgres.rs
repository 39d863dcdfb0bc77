use super::{LedgerError, LedgerStore};
use crate::entities::balances::{Balance, GetBalance};
use crate::entities::orders::{CreateOrder, GetUserOrders, OrderInsertOutcome, OrderRecord};
use crate::entities::processing_claims::{
    ClaimOrdersForProcessing, ClaimedOrder, RecoverCrashedClaims, ReleaseClaimsOf,
};
use crate::entities::settlement::{ResolvedAccrual, SettleBatch, SettlementSummary};
use crate::entities::users::{CreateUser, GetUserByLogin, UserRecord};
use crate::entities::withdrawals::{DebitOutcome, GetUserWithdrawals, Withdraw, WithdrawalRecord};
use crate::framework::DatabaseProcessor;
use crate::utils::ClaimOwner;
use async_trait::async_trait;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
impl LedgerStore for DatabaseProcessor {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
    ) -> Result<Option<Uuid>, LedgerError> {
        let user_id = self
            .process(CreateUser {
                login: login.to_string(),
                password_hash: password_hash.to_string(),
            })
            .await?;
        Ok(user_id)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<UserRecord>, LedgerError> {
        let user = self
            .process(GetUserByLogin {
                login: login.to_string(),
            })
            .await?;
        Ok(user)
    }

    async fn create_order(
        &self,
        order_id: &str,
        user_id: Uuid,
    ) -> Result<OrderInsertOutcome, LedgerError> {
        let outcome = self
            .process(CreateOrder {
                order_id: order_id.to_string(),
                user_id,
            })
            .await?;
        Ok(outcome)
    }

    async fn get_user_orders(&self, user_id: Uuid) -> Result<Vec<OrderRecord>, LedgerError> {
        Ok(self.process(GetUserOrders { user_id }).await?)
    }

    async fn get_balance(&self, user_id: Uuid) -> Result<Balance, LedgerError> {
        let balance = self.process(GetBalance { user_id }).await?;
        Ok(balance.unwrap_or_default())
    }

    async fn withdraw(
        &self,
        user_id: Uuid,
        order_id: &str,
        amount: Decimal,
    ) -> Result<DebitOutcome, LedgerError> {
        let outcome = self
            .process(Withdraw {
                user_id,
                order_id: order_id.to_string(),
                amount,
            })
            .await?;
        Ok(outcome)
    }

    async fn get_user_withdrawals(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WithdrawalRecord>, LedgerError> {
        Ok(self.process(GetUserWithdrawals { user_id }).await?)
    }

    async fn claim_orders_for_processing(
        &self,
        owner: &ClaimOwner,
        limit: usize,
    ) -> Result<Vec<ClaimedOrder>, LedgerError> {
        let claimed = self
            .process(ClaimOrdersForProcessing {
                owner: owner.clone(),
                limit,
            })
            .await?;
        Ok(claimed)
    }

    async fn release_claims_of(&self, owner: &ClaimOwner) -> Result<u64, LedgerError> {
        Ok(self
            .process(ReleaseClaimsOf {
                owner: owner.clone(),
            })
            .await?)
    }

    async fn recover_crashed_claims(&self, stale_after: Duration) -> Result<u64, LedgerError> {
        Ok(self.process(RecoverCrashedClaims { stale_after }).await?)
    }

    async fn settle_batch(
        &self,
        owner: &ClaimOwner,
        results: Vec<ResolvedAccrual>,
    ) -> Result<SettlementSummary, LedgerError> {
        Ok(self
            .process(SettleBatch {
                owner: owner.clone(),
                results,
            })
            .await?)
    }
}
