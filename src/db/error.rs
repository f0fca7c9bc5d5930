use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. For posts this means the
    /// entry was already ingested.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.message().contains("UNIQUE constraint failed") =>
            {
                StoreError::DuplicateKey(db_err.message().to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("no matching row".to_string()),
            other => StoreError::Database(other),
        }
    }
}
