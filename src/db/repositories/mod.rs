mod article_repository;
mod assessment_repository;
mod course_repository;
mod learning_repository;
mod user_repository;
mod webinar_repository;

use async_trait::async_trait;
use sqlx::PgPool;

use super::error::StoreError;
use super::repository::StoreHealth;

/// Postgres backend. Uniqueness constraints and atomic counter updates live
/// in the SQL schema (see ./migrations); every repository maps a
/// unique-violation to `StoreError::Duplicate` at this boundary.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }
}
