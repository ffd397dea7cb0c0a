/// Domain-level error type shared across the workspace.
///
/// The API layer maps these onto HTTP statuses in its `AppError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Entity kind, e.g. `"DuplicatePair"`.
        entity: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The request is well-formed but not valid in the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
