use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub login: String,
    pub password_hash: String,
    pub created_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
/// Register a user together with an empty balance row.
///
/// Returns `None` when the login is already taken.
pub struct CreateUser {
    pub login: String,
    pub password_hash: String,
}

impl Processor<CreateUser> for DatabaseProcessor {
    type Output = Option<Uuid>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateUser")]
    async fn process(&self, cmd: CreateUser) -> Result<Option<Uuid>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (login) DO NOTHING
            RETURNING user_id
            "#,
        )
        .bind(&cmd.login)
        .bind(&cmd.password_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = inserted else {
            return Ok(None);
        };

        sqlx::query("INSERT INTO user_balances (user_id) VALUES ($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(user_id))
    }
}

#[derive(Debug, Clone)]
pub struct GetUserByLogin {
    pub login: String,
}

impl Processor<GetUserByLogin> for DatabaseProcessor {
    type Output = Option<UserRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserByLogin")]
    async fn process(&self, query: GetUserByLogin) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT user_id, login, password_hash, created_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(&query.login)
        .fetch_optional(&self.pool)
        .await
    }
}
