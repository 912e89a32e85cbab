use thiserror::Error;

/// Collaborator-facing error. Every trait in [`crate::traits`] returns it,
/// carrying the underlying cause as text so it can cross crate boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VouchError {
    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("ledger rejected request: {0}")]
    Rejected(String),

    #[error("ledger timeout")]
    Timeout,

    #[error("signer error: {0}")]
    Signer(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type VouchResult<T> = Result<T, VouchError>;
