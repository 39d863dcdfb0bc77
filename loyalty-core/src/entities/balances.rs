use crate::framework::{DatabaseProcessor, PgTransaction};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Spendable points and the running total of everything withdrawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct Balance {
    #[sqlx(rename = "current_balance")]
    pub current: Decimal,
    #[sqlx(rename = "withdrawn_total")]
    pub withdrawn: Decimal,
}

#[derive(Debug, Clone)]
pub struct GetBalance {
    pub user_id: Uuid,
}

impl Processor<GetBalance> for DatabaseProcessor {
    type Output = Option<Balance>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetBalance")]
    async fn process(&self, query: GetBalance) -> Result<Option<Balance>, sqlx::Error> {
        sqlx::query_as::<_, Balance>(
            r#"
            SELECT current_balance, withdrawn_total
            FROM user_balances
            WHERE user_id = $1
            "#,
        )
        .bind(query.user_id)
        .fetch_optional(&self.pool)
        .await
    }
}

impl Balance {
    /// Add points to the spendable balance within a transaction.
    pub async fn credit_tx(
        tx: &mut PgTransaction<'_>,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_balances
            SET current_balance = current_balance + $2
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Move `amount` from the spendable balance to the withdrawn total.
    ///
    /// The guard lives in the statement, so concurrent debits can never take
    /// the balance below zero. Returns 0 when funds are insufficient.
    pub async fn debit_tx(
        tx: &mut PgTransaction<'_>,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_balances
            SET current_balance = current_balance - $2,
                withdrawn_total = withdrawn_total + $2
            WHERE user_id = $1 AND current_balance >= $2
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
