use thiserror::Error;

/// Error type for the vouch binary and library surface, aggregating the
/// errors of the member crates.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("proof error: {0}")]
    Proof(#[from] vouch_proof::ProofError),

    #[error("attestation error: {0}")]
    Lifecycle(#[from] vouch_attest::LifecycleError),

    #[error("{0}")]
    Core(#[from] vouch_core::VouchError),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RootError {
    fn from(e: serde_json::Error) -> Self {
        RootError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RootError {
    fn from(e: toml::de::Error) -> Self {
        RootError::Config(format!("TOML parse error: {}", e))
    }
}

pub type RootResult<T> = Result<T, RootError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_error_display() {
        let err = RootError::Config("missing schema".into());
        assert_eq!(err.to_string(), "configuration error: missing schema");

        let err = RootError::VerificationFailed("root mismatch".into());
        assert_eq!(err.to_string(), "verification failed: root mismatch");
    }

    #[test]
    fn test_root_error_from_member_crates() {
        let err: RootError = vouch_proof::ProofError::EmptyRecord.into();
        assert_eq!(err.to_string(), "proof error: record has no fields");

        let err: RootError = vouch_attest::LifecycleError::EmptyBatch.into();
        assert_eq!(err.to_string(), "attestation error: batch is empty");
    }

    #[test]
    fn test_root_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: RootError = json_err.into();
        assert!(matches!(err, RootError::Serialization(_)));
    }
}
