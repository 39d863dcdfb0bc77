use crate::framework::{DatabaseProcessor, PgTransaction};
use crate::utils::ClaimOwner;
use kanau::processor::Processor;
use std::time::Duration;
use uuid::Uuid;

/// Work-queue entry of an order that still awaits a terminal status.
///
/// A claim without owner is free; an owned claim is leased to one running
/// instance until it is released, settled or cleared by crash recovery.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProcessingClaim {
    pub order_id: String,
    pub user_id: Uuid,
    pub claim_owner: Option<String>,
    pub claimed_at: Option<time::OffsetDateTime>,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct ClaimedOrder {
    pub order_id: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
/// Lease up to `limit` free orders to `owner`, least recently touched first.
///
/// Only claims without an owner are taken. An owned claim goes back to the
/// pool through its owner's release or through [`RecoverCrashedClaims`].
/// `SKIP LOCKED` keeps two concurrent callers from ever receiving the same
/// order.
pub struct ClaimOrdersForProcessing {
    pub owner: ClaimOwner,
    pub limit: usize,
}

impl Processor<ClaimOrdersForProcessing> for DatabaseProcessor {
    type Output = Vec<ClaimedOrder>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ClaimOrdersForProcessing")]
    async fn process(
        &self,
        cmd: ClaimOrdersForProcessing,
    ) -> Result<Vec<ClaimedOrder>, sqlx::Error> {
        if cmd.limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(cmd.limit).unwrap_or(i64::MAX);

        sqlx::query_as::<_, ClaimedOrder>(
            r#"
            WITH picked AS (
                SELECT order_id
                FROM processing_claims
                WHERE claim_owner IS NULL
                ORDER BY updated_at, order_id
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE processing_claims AS c
            SET claim_owner = $1, claimed_at = now(), updated_at = now()
            FROM picked
            WHERE c.order_id = picked.order_id
            RETURNING c.order_id, c.user_id
            "#,
        )
        .bind(cmd.owner.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Return every claim held by `owner` to the free pool.
///
/// `updated_at` is kept, so released orders keep their place in the queue.
pub struct ReleaseClaimsOf {
    pub owner: ClaimOwner,
}

impl Processor<ReleaseClaimsOf> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ReleaseClaimsOf")]
    async fn process(&self, cmd: ReleaseClaimsOf) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE processing_claims
            SET claim_owner = NULL, claimed_at = NULL
            WHERE claim_owner = $1
            "#,
        )
        .bind(cmd.owner.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Free claims of any owner that were taken more than `stale_after` ago.
pub struct RecoverCrashedClaims {
    pub stale_after: Duration,
}

impl Processor<RecoverCrashedClaims> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RecoverCrashedClaims")]
    async fn process(&self, cmd: RecoverCrashedClaims) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE processing_claims
            SET claim_owner = NULL, claimed_at = NULL
            WHERE claim_owner IS NOT NULL
              AND claimed_at < now() - make_interval(secs => $1)
            "#,
        )
        .bind(cmd.stale_after.as_secs_f64())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl ProcessingClaim {
    /// Remove the claim of a finalized order within a transaction.
    pub async fn delete_tx(tx: &mut PgTransaction<'_>, order_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM processing_claims WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Re-stamp a claim still held by `owner`, moving it behind older work.
    pub async fn touch_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
        owner: &ClaimOwner,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE processing_claims
            SET updated_at = now()
            WHERE order_id = $1 AND claim_owner = $2
            "#,
        )
        .bind(order_id)
        .bind(owner.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
