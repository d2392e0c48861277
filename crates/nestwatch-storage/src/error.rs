/// Errors that can occur within the storage layer.
///
/// The pipeline treats every variant as a `PersistenceError`: logged,
/// surfaced via stats, never allowed to crash the dispatch loop.
///
/// # Examples
///
/// ```rust
/// use nestwatch_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "alert",
///     id: "alert-99".to_string(),
/// };
/// assert!(err.to_string().contains("alert"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the store.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An insert collided with an existing row id, which should be
    /// unreachable with snowflake ids.
    #[error("Storage: duplicate {entity} id {id}")]
    DuplicateId { entity: &'static str, id: String },

    /// The entity violates a store-level invariant (e.g. acknowledging
    /// an alert twice).
    #[error("Storage: conflict on {entity} (id={id}): {reason}")]
    Conflict {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// JSON serialization or deserialization failure (e.g. metadata columns).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
