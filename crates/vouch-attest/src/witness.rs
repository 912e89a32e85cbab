//! Witnessed records: a signature over the root instead of a ledger entry.

use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, VerifyingKey};
use rand::RngCore;
use zeroize::Zeroizing;

use vouch_core::{
    sha256, AttestationUid, FixedHash, MessageSigner, SchemaId, SubjectId, Timestamp, VouchResult,
};

use crate::types::AttestationRecord;

const WITNESS_DOMAIN: &[u8] = b"vouch.witness.v1";

/// Bytes a witness signs for one record.
///
/// `domain ‖ len32(schema) ‖ schema ‖ len32(subject) ‖ subject ‖ root ‖
/// issued_at.seconds_be64 ‖ issued_at.nanos_be32`
pub fn witness_message(
    schema_id: &SchemaId,
    subject: &SubjectId,
    root: &FixedHash,
    issued_at: Timestamp,
) -> Vec<u8> {
    let schema = schema_id.as_str().as_bytes();
    let subject = subject.as_str().as_bytes();
    let mut msg = Vec::with_capacity(WITNESS_DOMAIN.len() + schema.len() + subject.len() + 52);
    msg.extend_from_slice(WITNESS_DOMAIN);
    msg.extend_from_slice(&(schema.len() as u32).to_be_bytes());
    msg.extend_from_slice(schema);
    msg.extend_from_slice(&(subject.len() as u32).to_be_bytes());
    msg.extend_from_slice(subject);
    msg.extend_from_slice(root.as_bytes());
    msg.extend_from_slice(&issued_at.seconds_since_epoch.to_be_bytes());
    msg.extend_from_slice(&issued_at.nanoseconds.to_be_bytes());
    msg
}

/// Witnessed uids are the hex digest of the signed message.
pub fn witness_uid(message: &[u8]) -> AttestationUid {
    AttestationUid::new(format!("0x{}", sha256(message).to_hex()))
}

/// Check a witnessed record's signature against its own fields.
/// Records without a witness are not witnessed and never verify here.
pub fn verify_witness(record: &AttestationRecord) -> bool {
    let Some(witness) = &record.witness else {
        return false;
    };
    let message = witness_message(&record.schema_id, &record.subject, &record.root, record.issued_at);
    if witness_uid(&message) != record.uid {
        return false;
    }
    match VerifyingKey::from_bytes(&witness.public_key) {
        Ok(vk) => vk
            .verify_strict(&message, &Signature::from_bytes(&witness.signature))
            .is_ok(),
        Err(_) => false,
    }
}

/// Ed25519 message signer.
pub struct Ed25519Signer {
    signing_key: Zeroizing<[u8; 32]>,
    verifying_key: [u8; 32],
}

impl Ed25519Signer {
    pub fn from_bytes(key_bytes: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&key_bytes);
        Self {
            verifying_key: signing_key.verifying_key().to_bytes(),
            signing_key: Zeroizing::new(key_bytes),
        }
    }

    /// Fresh key from the OS RNG.
    pub fn generate() -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut seed[..]);
        Self::from_bytes(*seed)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        match VerifyingKey::from_bytes(&self.verifying_key) {
            Ok(vk) => vk
                .verify_strict(message, &Signature::from_bytes(signature))
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl MessageSigner for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> VouchResult<[u8; 64]> {
        let signing_key = SigningKey::from_bytes(&self.signing_key);
        Ok(signing_key.sign(message).to_bytes())
    }

    fn public_key(&self) -> [u8; 32] {
        self.verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Witness;

    fn witnessed(signer: &Ed25519Signer) -> AttestationRecord {
        let schema = SchemaId::new("0xschema");
        let subject = SubjectId::new("alice");
        let root = FixedHash([3; 32]);
        let issued_at = Timestamp::from_seconds(1_700_000_000);
        let message = witness_message(&schema, &subject, &root, issued_at);
        AttestationRecord {
            uid: witness_uid(&message),
            schema_id: schema,
            record_type: "forecast".into(),
            subject,
            issued_at,
            revocable: false,
            revoked_at: None,
            expiration: None,
            root,
            field_count: 3,
            witness: Some(Witness {
                public_key: signer.public_key(),
                signature: signer.sign(&message).unwrap(),
            }),
        }
    }

    #[test]
    fn test_signer_roundtrip() {
        let signer = Ed25519Signer::from_bytes([0x42; 32]);
        let sig = signer.sign(b"hello").unwrap();
        assert!(signer.verify(b"hello", &sig));
        assert!(!signer.verify(b"hullo", &sig));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(
            Ed25519Signer::generate().public_key(),
            Ed25519Signer::generate().public_key()
        );
    }

    #[test]
    fn test_message_binds_every_part() {
        let schema = SchemaId::new("s");
        let subject = SubjectId::new("alice");
        let root = FixedHash([1; 32]);
        let t = Timestamp::from_seconds(10);
        let base = witness_message(&schema, &subject, &root, t);

        assert_ne!(base, witness_message(&SchemaId::new("s2"), &subject, &root, t));
        assert_ne!(base, witness_message(&schema, &SubjectId::new("bob"), &root, t));
        assert_ne!(base, witness_message(&schema, &subject, &FixedHash([2; 32]), t));
        assert_ne!(base, witness_message(&schema, &subject, &root, Timestamp::from_seconds(11)));
        // Length prefixes keep the schema/subject boundary unambiguous.
        assert_ne!(
            witness_message(&SchemaId::new("ab"), &SubjectId::new("c"), &root, t),
            witness_message(&SchemaId::new("a"), &SubjectId::new("bc"), &root, t)
        );
    }

    #[test]
    fn test_verify_witness() {
        let signer = Ed25519Signer::from_bytes([7; 32]);
        let record = witnessed(&signer);
        assert!(verify_witness(&record));

        let mut tampered = record.clone();
        tampered.root = FixedHash([4; 32]);
        assert!(!verify_witness(&tampered));

        let mut foreign_key = record.clone();
        foreign_key.witness = Some(Witness {
            public_key: Ed25519Signer::from_bytes([8; 32]).public_key(),
            signature: record.witness.as_ref().map(|w| w.signature).unwrap(),
        });
        assert!(!verify_witness(&foreign_key));

        let mut unwitnessed = record;
        unwitnessed.witness = None;
        assert!(!verify_witness(&unwitnessed));
    }
}
