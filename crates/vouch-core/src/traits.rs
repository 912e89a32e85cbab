use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VouchResult;
use crate::types::{AttestationUid, FixedHash, SchemaId, SubjectId, Timestamp};

// ---------------------------------------------------------------------------
// Ledger publication
// ---------------------------------------------------------------------------

/// What gets anchored on the ledger for one attestation.
///
/// `root` doubles as the idempotency key: publishing the same
/// `(schema_id, subject, root)` twice must yield the same uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub schema_id: SchemaId,
    pub subject: SubjectId,
    pub root: FixedHash,
    pub revocable: bool,
    pub expiration: Option<Timestamp>,
    /// Opaque public payload (the serialized field set) for fully public
    /// records; `None` when only the root is published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_data: Option<Vec<u8>>,
}

/// A record as the ledger reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub uid: AttestationUid,
    pub schema_id: SchemaId,
    pub subject: SubjectId,
    pub root: FixedHash,
    pub issued_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub expiration: Option<Timestamp>,
}

/// Anchors attestation roots on a public, tamper-evident ledger.
///
/// Contract:
/// - implementations do not retry internally;
/// - batch calls either apply every element or fail the whole call when
///   [`LedgerPublisher::atomic_batches`] returns true;
/// - timeouts surface as `VouchError::Timeout`.
#[async_trait]
pub trait LedgerPublisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> VouchResult<AttestationUid>;

    async fn revoke_on_ledger(&self, uid: &AttestationUid) -> VouchResult<()>;

    async fn batch_publish(&self, requests: &[PublishRequest])
        -> VouchResult<Vec<AttestationUid>>;

    async fn batch_revoke(&self, uids: &[AttestationUid]) -> VouchResult<()>;

    /// Whether batch calls are all-or-nothing.
    fn atomic_batches(&self) -> bool;
}

/// Reads previously published attestations back from the ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn fetch_record(&self, uid: &AttestationUid) -> VouchResult<Option<LedgerEntry>>;
}

// ---------------------------------------------------------------------------
// MessageSigner — Ed25519 signing capability for witnessed records
// ---------------------------------------------------------------------------

pub trait MessageSigner: Send + Sync {
    fn sign(&self, message: &[u8]) -> VouchResult<[u8; 64]>;
    fn public_key(&self) -> [u8; 32];
}
