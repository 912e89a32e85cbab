use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vouch_core::types::hex_bytes;
use vouch_core::{AttestationUid, FixedHash, SchemaId, SubjectId, Timestamp};
use vouch_proof::Field;

use crate::status::AttestationStatus;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// How much of a record is published next to its root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disclosure {
    /// Field values are published alongside the root.
    #[default]
    Public,
    /// Only the root is published; fields are revealed later by proof.
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOptions {
    #[serde(default = "default_true")]
    pub revocable: bool,
    /// `None` never expires.
    #[serde(default)]
    pub expiration: Option<Timestamp>,
    #[serde(default)]
    pub disclosure: Disclosure,
}

fn default_true() -> bool {
    true
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            revocable: true,
            expiration: None,
            disclosure: Disclosure::Public,
        }
    }
}

/// One record to attest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Logical record type, resolved to a schema through `AttestConfig`.
    pub record_type: String,
    pub subject: SubjectId,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub options: CreateOptions,
}

impl CreateRequest {
    pub fn new(record_type: impl Into<String>, subject: impl Into<SubjectId>, fields: Vec<Field>) -> Self {
        Self {
            record_type: record_type.into(),
            subject: subject.into(),
            fields,
            options: CreateOptions::default(),
        }
    }

    pub fn revocable(mut self, revocable: bool) -> Self {
        self.options.revocable = revocable;
        self
    }

    pub fn expires_at(mut self, expiration: Timestamp) -> Self {
        self.options.expiration = Some(expiration);
        self
    }

    pub fn disclosure(mut self, disclosure: Disclosure) -> Self {
        self.options.disclosure = disclosure;
        self
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Signature over a root that stands in for ledger publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    #[serde(with = "hex_bytes")]
    pub public_key: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub signature: [u8; 64],
}

/// The stored identity of one attestation.
///
/// Holds the root only. The field set stays with whoever built the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub uid: AttestationUid,
    pub schema_id: SchemaId,
    pub record_type: String,
    pub subject: SubjectId,
    pub issued_at: Timestamp,
    pub revocable: bool,
    pub revoked_at: Option<Timestamp>,
    pub expiration: Option<Timestamp>,
    pub root: FixedHash,
    pub field_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
}

impl AttestationRecord {
    pub fn is_witnessed(&self) -> bool {
        self.witness.is_some()
    }
}

/// Display form of a record with derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationView {
    pub record: AttestationRecord,
    pub status: AttestationStatus,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AttestationView {
    pub fn at(record: AttestationRecord, now: Timestamp) -> Self {
        let status = AttestationStatus::derive(record.revoked_at, record.expiration, now);
        Self {
            status,
            revoked: record.revoked_at.is_some(),
            revoked_at: record.revoked_at.and_then(|t| t.to_datetime()),
            expires_at: record.expiration.and_then(|t| t.to_datetime()),
            record,
        }
    }
}

impl From<AttestationRecord> for AttestationView {
    fn from(record: AttestationRecord) -> Self {
        Self::at(record, Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AttestationRecord {
        AttestationRecord {
            uid: AttestationUid::new("0x01"),
            schema_id: SchemaId::new("0xschema"),
            record_type: "forecast".into(),
            subject: SubjectId::new("alice"),
            issued_at: Timestamp::from_seconds(1_000),
            revocable: true,
            revoked_at: None,
            expiration: None,
            root: FixedHash([9; 32]),
            field_count: 3,
            witness: None,
        }
    }

    #[test]
    fn test_create_request_builder() {
        let req = CreateRequest::new("forecast", "alice", vec![Field::uint("p", 1)])
            .revocable(false)
            .disclosure(Disclosure::Private)
            .expires_at(Timestamp::from_seconds(50));
        assert!(!req.options.revocable);
        assert_eq!(req.options.disclosure, Disclosure::Private);
        assert_eq!(req.options.expiration, Some(Timestamp::from_seconds(50)));
    }

    #[test]
    fn test_create_request_json_defaults() {
        let req: CreateRequest = serde_json::from_value(serde_json::json!({
            "record_type": "forecast",
            "subject": "alice",
            "fields": [{ "name": "p", "type": "uint", "value": 7500 }]
        }))
        .unwrap();
        assert_eq!(req.options, CreateOptions::default());
        assert_eq!(req.fields[0], Field::uint("p", 7500));
    }

    #[test]
    fn test_view_of_revoked_record() {
        let mut r = record();
        r.revoked_at = Some(Timestamp::from_seconds(2_000));
        let view = AttestationView::at(r, Timestamp::from_seconds(3_000));
        assert!(view.revoked);
        assert_eq!(view.status, AttestationStatus::Revoked);
        assert_eq!(view.revoked_at.map(|d| d.timestamp()), Some(2_000));
    }

    #[test]
    fn test_view_of_active_record() {
        let view = AttestationView::at(record(), Timestamp::from_seconds(3_000));
        assert!(!view.revoked);
        assert_eq!(view.revoked_at, None);
        assert_eq!(view.status, AttestationStatus::Active);
    }

    #[test]
    fn test_view_expires_at_the_expiration_instant() {
        let mut r = record();
        r.expiration = Some(Timestamp::from_seconds(3_000));
        let before = AttestationView::at(r.clone(), Timestamp::from_seconds(2_999));
        assert_eq!(before.status, AttestationStatus::Active);
        let at = AttestationView::at(r, Timestamp::from_seconds(3_000));
        assert_eq!(at.status, AttestationStatus::Expired);
        assert_eq!(at.expires_at.map(|d| d.timestamp()), Some(3_000));
    }

    #[test]
    fn test_witness_serializes_as_hex() {
        let w = Witness {
            public_key: [1; 32],
            signature: [2; 64],
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["public_key"], serde_json::json!("01".repeat(32)));
        assert_eq!(json["signature"], serde_json::json!("02".repeat(64)));
    }
}
