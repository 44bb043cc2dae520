use thiserror::Error;

/// Unified error type for storage operations that application code can handle.
///
/// The embedded store only distinguishes "entity missing" from "something the
/// caller cannot recover from"; everything else is a domain concern and lives
/// in [`crate::errors::Error`].
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type alias for storage operation results
pub type Result<T> = std::result::Result<T, DbError>;
