use thiserror::Error;
use vouch_core::{AttestationUid, VouchError};
use vouch_proof::ProofError;

/// Error type for attestation lifecycle operations.
///
/// Lifecycle and input errors are raised before any collaborator call and
/// leave local state untouched. Collaborator failures carry their cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("no schema configured for record type '{0}'")]
    SchemaNotConfigured(String),

    #[error("record has no fields")]
    EmptyRecord,

    #[error("batch is empty")]
    EmptyBatch,

    #[error("batch entry {position} requests non-public disclosure")]
    BatchDisclosureUnsupported { position: usize },

    #[error("ledger publisher does not offer atomic batches")]
    BatchNotAtomic,

    #[error("attestation {0} is not revocable")]
    NotRevocable(AttestationUid),

    #[error("attestation {0} is already revoked")]
    AlreadyRevoked(AttestationUid),

    #[error("attestation not found: {0}")]
    NotFound(AttestationUid),

    #[error("ledger call timed out after {timeout_ms}ms")]
    PublishTimeout { timeout_ms: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("proof error: {0}")]
    Proof(#[from] ProofError),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] VouchError),
}

impl LifecycleError {
    /// Errors the caller fixes by correcting input.
    pub fn is_input_error(&self) -> bool {
        match self {
            LifecycleError::EmptyRecord
            | LifecycleError::EmptyBatch
            | LifecycleError::BatchDisclosureUnsupported { .. } => true,
            LifecycleError::Proof(e) => e.is_input_error(),
            _ => false,
        }
    }

    /// Errors surfaced from the ledger or signer. Retry policy is the caller's.
    pub fn is_collaborator_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::PublishTimeout { .. } | LifecycleError::Collaborator(_)
        )
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = LifecycleError::AlreadyRevoked(AttestationUid::new("0xabc"));
        assert_eq!(e.to_string(), "attestation 0xabc is already revoked");

        let e = LifecycleError::PublishTimeout { timeout_ms: 30_000 };
        assert_eq!(e.to_string(), "ledger call timed out after 30000ms");
    }

    #[test]
    fn test_from_proof_and_collaborator_errors() {
        let e: LifecycleError = ProofError::FieldNotFound("x".into()).into();
        assert!(e.is_input_error());

        let e: LifecycleError = VouchError::Ledger("down".into()).into();
        assert!(e.is_collaborator_error());
        assert!(!e.is_input_error());
    }

    #[test]
    fn test_classification() {
        assert!(LifecycleError::EmptyBatch.is_input_error());
        assert!(!LifecycleError::NotRevocable(AttestationUid::new("u")).is_input_error());
        assert!(LifecycleError::PublishTimeout { timeout_ms: 1 }.is_collaborator_error());
    }
}
