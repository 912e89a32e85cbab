//! Derived attestation status.
//!
//! Only `revoked_at` is stored. `Active` and `Expired` are computed from it,
//! the expiration and the current time:
//!
//!   Active  = revoked_at is None and (no expiration or now < expiration)
//!   Revoked = revoked_at is Some (terminal, wins over expiry)
//!   Expired = not revoked and now >= expiration (terminal)

use serde::{Deserialize, Serialize};
use std::fmt;

use vouch_core::Timestamp;

use crate::error::{LifecycleError, LifecycleResult};
use crate::types::AttestationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationStatus {
    Active,
    Revoked,
    Expired,
}

impl AttestationStatus {
    /// Status at `now`. Expiry is inclusive: a record is `Expired` from its
    /// expiration instant on.
    pub fn derive(
        revoked_at: Option<Timestamp>,
        expiration: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        match (revoked_at, expiration) {
            (Some(_), _) => AttestationStatus::Revoked,
            (None, Some(exp)) if now >= exp => AttestationStatus::Expired,
            _ => AttestationStatus::Active,
        }
    }
}

impl fmt::Display for AttestationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttestationStatus::Active => write!(f, "active"),
            AttestationStatus::Revoked => write!(f, "revoked"),
            AttestationStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Whether `record` may move to `Revoked`. Expired records may still be
/// revoked; revocation is the only stored transition.
pub fn check_revocable(record: &AttestationRecord) -> LifecycleResult<()> {
    if !record.revocable {
        return Err(LifecycleError::NotRevocable(record.uid.clone()));
    }
    if record.revoked_at.is_some() {
        return Err(LifecycleError::AlreadyRevoked(record.uid.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_core::{AttestationUid, FixedHash, SchemaId, SubjectId};

    fn ts(s: u64) -> Timestamp {
        Timestamp::from_seconds(s)
    }

    #[test]
    fn test_derive_status() {
        assert_eq!(AttestationStatus::derive(None, None, ts(10)), AttestationStatus::Active);
        assert_eq!(
            AttestationStatus::derive(None, Some(ts(20)), ts(10)),
            AttestationStatus::Active
        );
        assert_eq!(
            AttestationStatus::derive(None, Some(ts(20)), ts(20)),
            AttestationStatus::Expired
        );
        assert_eq!(
            AttestationStatus::derive(Some(ts(5)), Some(ts(20)), ts(30)),
            AttestationStatus::Revoked
        );
    }

    #[test]
    fn test_check_revocable() {
        let mut record = AttestationRecord {
            uid: AttestationUid::new("u1"),
            schema_id: SchemaId::new("s"),
            record_type: "forecast".into(),
            subject: SubjectId::new("alice"),
            issued_at: ts(1),
            revocable: false,
            revoked_at: None,
            expiration: None,
            root: FixedHash([0; 32]),
            field_count: 1,
            witness: None,
        };
        assert!(matches!(
            check_revocable(&record),
            Err(LifecycleError::NotRevocable(_))
        ));

        record.revocable = true;
        assert!(check_revocable(&record).is_ok());

        record.revoked_at = Some(ts(2));
        assert!(matches!(
            check_revocable(&record),
            Err(LifecycleError::AlreadyRevoked(_))
        ));
    }
}
