use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Collapses a sqlx error into `Duplicate` when the database reports a
    /// unique-constraint violation. Every create race in this system
    /// (enrollment, certificate, like, registration) funnels through here.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Sqlx(err)
    }
}
