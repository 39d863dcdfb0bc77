use sqlx::PgPool;

/// Entry point for the SQL processors in [`crate::entities`].
///
/// Each query or command is a plain struct; running it is
/// `DatabaseProcessor::process(query)`.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

/// A Postgres transaction, as threaded through multi-step commands.
pub type PgTransaction<'c> = sqlx::Transaction<'c, sqlx::Postgres>;
