use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store operation. Any error returned from inside
/// [`crate::Database::with_tx`] rolls the transaction back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Gone(String),

    #[error("You have already reacted with this type")]
    DuplicateReaction,

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("Failed to send email: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("DB lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Map a missing single-row result to `None` instead of an error.
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
