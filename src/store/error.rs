use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Ledger store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Storage fault: {0}")]
    StorageFault(#[source] BoxError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    /// Wrap any backend cause as a storage fault
    pub fn fault(cause: impl Into<BoxError>) -> Self {
        StoreError::StorageFault(cause.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "NOT_FOUND",
            StoreError::StorageFault(_) => "STORAGE_FAULT",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::StorageFault(_) => 500,
        }
    }
}

// "No rows" is resolved by the queries themselves (fetch_optional -> NotFound),
// so every sqlx error reaching this conversion is a genuine fault.
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::StorageFault(Box::new(e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
