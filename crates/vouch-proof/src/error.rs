use thiserror::Error;

/// Error type for the vouch-proof crate.
///
/// Input errors are raised before any hashing happens. Verification
/// failures never carry the undisclosed data they were checked against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProofError {
    #[error("type mismatch for field '{field}': declared {declared}, found {found}")]
    TypeMismatch {
        field: String,
        declared: String,
        found: String,
    },

    #[error("unsupported field type: {0}")]
    UnsupportedType(String),

    #[error("record has no fields")]
    EmptyRecord,

    #[error("field at position {0} has an empty name")]
    EmptyFieldName(usize),

    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    #[error("record has {0} fields, more than a u32 index can address")]
    TooManyFields(usize),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("reveal set is empty")]
    EmptyReveal,

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("root mismatch for field '{0}'")]
    RootMismatch(String),

    #[error("proof root does not match the published root")]
    RootNotPublished,
}

impl ProofError {
    /// Caller-correctable input errors, rejected before any hashing.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ProofError::TypeMismatch { .. }
                | ProofError::UnsupportedType(_)
                | ProofError::EmptyRecord
                | ProofError::EmptyFieldName(_)
                | ProofError::DuplicateField(_)
                | ProofError::TooManyFields(_)
                | ProofError::FieldNotFound(_)
                | ProofError::EmptyReveal
        )
    }

    /// Structural or cryptographic verification failures.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            ProofError::MalformedProof(_)
                | ProofError::RootMismatch(_)
                | ProofError::RootNotPublished
        )
    }
}

pub type ProofResult<T> = Result<T, ProofError>;
