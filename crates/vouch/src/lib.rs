//! Vouch
//!
//! Selective-disclosure attestation engine. A record of named, typed fields
//! is committed to with a Merkle root; the holder later proves that a
//! subset of the fields belongs to the record, and anyone holding only the
//! published root can check it.
//!
//! # Architecture
//!
//! - `vouch-core`: digests, timestamps, ids, collaborator traits
//! - `vouch-proof`: canonicalizer, leaf hasher, tree builder, proof
//!   extractor and verifier (pure, stateless)
//! - `vouch-attest`: lifecycle manager over ledger/signer collaborators
//! - this crate: configuration, file helpers and the `vouch` CLI

pub mod config;
pub mod error;

pub use config::{LogConfig, RootConfig};
pub use error::{RootError, RootResult};

pub use vouch_attest::{
    AttestConfig, AttestationManager, AttestationRecord, AttestationStatus, AttestationView,
    CreateOptions, CreateRequest, Disclosure, Ed25519Signer, InMemoryLedger, LifecycleError,
};
pub use vouch_core::{AttestationUid, FixedHash, SchemaId, SubjectId, Timestamp};
pub use vouch_proof::{
    build_tree, generate_proof, verify_proof, verify_proof_report, Field, FieldType, FieldValue,
    Proof, ProofError, Tree, VerificationReport,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

// ---------------------------------------------------------------------------
// Record input
// ---------------------------------------------------------------------------

/// Parse a record from JSON: either an array of `{ name, type, value }`
/// objects or an object with such an array under `"fields"`.
pub fn parse_record(json: Value) -> RootResult<Vec<Field>> {
    let fields = match json {
        Value::Object(mut obj) => obj
            .remove("fields")
            .ok_or_else(|| RootError::Serialization("record object has no \"fields\"".into()))?,
        other => other,
    };
    Ok(vouch_proof::fields_from_json(fields)?)
}

pub fn read_record(path: &Path) -> RootResult<Vec<Field>> {
    let contents = std::fs::read_to_string(path)?;
    let fields = parse_record(serde_json::from_str(&contents)?)?;
    debug!(path = %path.display(), fields = fields.len(), "read record");
    Ok(fields)
}

pub fn read_proof(path: &Path) -> RootResult<Proof> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write `proof` as pretty JSON, creating parent directories.
pub fn write_proof(path: &Path, proof: &Proof) -> RootResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(proof)?)?;
    debug!(path = %path.display(), revealed = proof.revealed_fields.len(), "wrote proof");
    Ok(())
}

// ---------------------------------------------------------------------------
// Build / prove / verify
// ---------------------------------------------------------------------------

/// Build the commitment tree for a record.
pub fn build_record(fields: &[Field]) -> RootResult<Tree> {
    Ok(build_tree(fields)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSummary {
    pub index: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub digest: FixedHash,
}

/// What a record commits to, without its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub root: FixedHash,
    pub leaf_count: usize,
    pub height: usize,
    pub leaves: Vec<LeafSummary>,
}

impl From<&Tree> for RecordSummary {
    fn from(tree: &Tree) -> Self {
        Self {
            root: tree.root(),
            leaf_count: tree.leaf_count(),
            height: tree.height(),
            leaves: tree
                .leaves()
                .iter()
                .map(|l| LeafSummary {
                    index: l.index,
                    name: l.name().to_string(),
                    field_type: l.field.declared_type,
                    digest: l.digest,
                })
                .collect(),
        }
    }
}

/// Build the tree for `fields` and prove the named subset.
pub fn prove_record<S: AsRef<str>>(fields: &[Field], names: &[S]) -> RootResult<Proof> {
    let tree = build_record(fields)?;
    Ok(generate_proof(&tree, names)?)
}

/// Verify `proof` against a hex root obtained out of band.
pub fn verify_against(proof: &Proof, expected_root_hex: &str) -> RootResult<VerificationReport> {
    let expected: FixedHash = expected_root_hex.parse()?;
    Ok(verify_proof_report(proof, &expected))
}

/// JSON rendering of a verification report.
pub fn report_to_json(report: &VerificationReport) -> Value {
    serde_json::json!({
        "valid": report.is_valid(),
        "proof_root": report.proof_root,
        "expected_root": report.expected_root,
        "error": report.failure().map(|e| e.to_string()),
        "fields": report.fields,
    })
}
