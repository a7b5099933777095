use thiserror::Error;

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error taxonomy for the matching-and-ledger core.
///
/// Every error raised inside a transactional operation aborts that
/// operation's entire transaction; callers never observe partially
/// applied state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing input fields. Never persisted.
    #[error("validation error: {0}")]
    Validation(String),
    /// Referenced account or leg does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Attempted mutation of a non-open leg, or a matching invariant
    /// violation.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Rate table missing and cannot be bootstrapped.
    #[error("configuration error: {0}")]
    Config(String),
    /// Storage unavailable or transaction failure. Callers may retry
    /// the whole operation.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}
