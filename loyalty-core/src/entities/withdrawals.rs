use crate::entities::balances::Balance;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WithdrawalRecord {
    pub order_id: String,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub processed_at: time::OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Withdrawn,
    InsufficientFunds,
    /// A withdrawal against this order number already exists.
    DuplicateDebit,
}

#[derive(Debug, Clone)]
/// Record a withdrawal and debit the balance atomically.
///
/// Either both the record and the debit land, or neither does.
pub struct Withdraw {
    pub user_id: Uuid,
    pub order_id: String,
    pub amount: Decimal,
}

impl Processor<Withdraw> for DatabaseProcessor {
    type Output = DebitOutcome;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:Withdraw")]
    async fn process(&self, cmd: Withdraw) -> Result<DebitOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let recorded = sqlx::query(
            r#"
            INSERT INTO withdrawals (order_id, user_id, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(&cmd.order_id)
        .bind(cmd.user_id)
        .bind(cmd.amount)
        .execute(&mut *tx)
        .await?;
        if recorded.rows_affected() == 0 {
            return Ok(DebitOutcome::DuplicateDebit);
        }

        if Balance::debit_tx(&mut tx, cmd.user_id, cmd.amount).await? == 0 {
            tx.rollback().await?;
            return Ok(DebitOutcome::InsufficientFunds);
        }

        tx.commit().await?;
        Ok(DebitOutcome::Withdrawn)
    }
}

#[derive(Debug, Clone)]
/// All withdrawals of a user, newest first.
pub struct GetUserWithdrawals {
    pub user_id: Uuid,
}

impl Processor<GetUserWithdrawals> for DatabaseProcessor {
    type Output = Vec<WithdrawalRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserWithdrawals")]
    async fn process(
        &self,
        query: GetUserWithdrawals,
    ) -> Result<Vec<WithdrawalRecord>, sqlx::Error> {
        sqlx::query_as::<_, WithdrawalRecord>(
            r#"
            SELECT order_id, user_id, amount, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at DESC, order_id
            "#,
        )
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await
    }
}
