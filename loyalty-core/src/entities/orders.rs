use crate::entities::OrderStatus;
use crate::framework::{DatabaseProcessor, PgTransaction};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub accrual: Option<Decimal>,
    pub uploaded_at: time::OffsetDateTime,
}

/// What happened to a submitted order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderInsertOutcome {
    /// New order, queued for reconciliation.
    Created,
    /// The same user submitted this number before; nothing changed.
    AlreadyOwned,
    /// Another user holds this number; nothing changed.
    OwnedByAnotherUser,
}

#[derive(Debug, Clone)]
/// Insert an order and its processing claim in one transaction.
///
/// Repeating the call is harmless: an existing number only reports its owner.
pub struct CreateOrder {
    pub order_id: String,
    pub user_id: Uuid,
}

impl Processor<CreateOrder> for DatabaseProcessor {
    type Output = OrderInsertOutcome;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateOrder")]
    async fn process(&self, cmd: CreateOrder) -> Result<OrderInsertOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(&cmd.order_id)
        .bind(cmd.user_id)
        .bind(OrderStatus::New)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let owner: Option<Uuid> =
                sqlx::query_scalar("SELECT user_id FROM orders WHERE order_id = $1")
                    .bind(&cmd.order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Ok(match owner {
                Some(owner) if owner == cmd.user_id => OrderInsertOutcome::AlreadyOwned,
                _ => OrderInsertOutcome::OwnedByAnotherUser,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO processing_claims (order_id, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(&cmd.order_id)
        .bind(cmd.user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(OrderInsertOutcome::Created)
    }
}

#[derive(Debug, Clone)]
/// All orders of a user, newest first.
pub struct GetUserOrders {
    pub user_id: Uuid,
}

impl Processor<GetUserOrders> for DatabaseProcessor {
    type Output = Vec<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserOrders")]
    async fn process(&self, query: GetUserOrders) -> Result<Vec<OrderRecord>, sqlx::Error> {
        sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT order_id, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE user_id = $1
            ORDER BY uploaded_at DESC, order_id
            "#,
        )
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await
    }
}

impl OrderRecord {
    /// Move a non-terminal order into a terminal status within a transaction.
    ///
    /// Returns the owner when this call performed the transition, `None`
    /// when the order was already terminal (or does not exist).
    pub async fn finalize_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3
            WHERE order_id = $1 AND status IN ('NEW', 'PROCESSING')
            RETURNING user_id
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(accrual)
        .fetch_optional(&mut **tx)
        .await
    }

    /// `NEW` becomes `PROCESSING`; any other status is left alone.
    pub async fn mark_processing_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'PROCESSING'
            WHERE order_id = $1 AND status = 'NEW'
            "#,
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
