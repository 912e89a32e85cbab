use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use vouch_core::{AttestationUid, SubjectId, Timestamp, VouchError, VouchResult};

use crate::types::AttestationRecord;

/// Append-only store of attestation records.
///
/// Records are never deleted. The only mutation is setting `revoked_at`,
/// which goes through a compare-and-swap so that exactly one revoker wins
/// each uid.
pub trait RecordStore: Send + Sync {
    /// Insert if no record with this uid exists. Returns `false` otherwise.
    fn insert(&self, record: AttestationRecord) -> VouchResult<bool>;

    /// Insert every record or none. Returns the first uid already present.
    fn insert_all(&self, records: Vec<AttestationRecord>) -> VouchResult<Option<AttestationUid>>;

    fn get(&self, uid: &AttestationUid) -> VouchResult<Option<AttestationRecord>>;

    /// Set `revoked_at` if it is currently unset. Returns `false` if the
    /// record was already revoked; errors if it does not exist.
    fn mark_revoked(&self, uid: &AttestationUid, at: Timestamp) -> VouchResult<bool>;

    /// Set `revoked_at` on every uid that is still unrevoked. Returns the
    /// uids that were already revoked and left untouched. Errors, marking
    /// nothing, if any uid does not exist.
    fn mark_all_revoked(
        &self,
        uids: &[AttestationUid],
        at: Timestamp,
    ) -> VouchResult<Vec<AttestationUid>>;

    fn list_by_subject(&self, subject: &SubjectId) -> VouchResult<Vec<AttestationRecord>>;

    fn count(&self) -> VouchResult<usize>;
}

type Records = HashMap<AttestationUid, AttestationRecord>;

/// In-memory record store.
pub struct InMemoryRecordStore {
    records: Mutex<Records>,
}

fn lock_records(mutex: &Mutex<Records>) -> VouchResult<MutexGuard<'_, Records>> {
    mutex
        .lock()
        .map_err(|e| VouchError::Storage(format!("lock poisoned: {}", e)))
}

fn missing(uid: &AttestationUid) -> VouchError {
    VouchError::Storage(format!("no record with uid {}", uid))
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: AttestationRecord) -> VouchResult<bool> {
        let mut records = lock_records(&self.records)?;
        if records.contains_key(&record.uid) {
            return Ok(false);
        }
        records.insert(record.uid.clone(), record);
        Ok(true)
    }

    fn insert_all(&self, batch: Vec<AttestationRecord>) -> VouchResult<Option<AttestationUid>> {
        let mut records = lock_records(&self.records)?;
        if let Some(existing) = batch.iter().find(|r| records.contains_key(&r.uid)) {
            return Ok(Some(existing.uid.clone()));
        }
        for record in batch {
            records.insert(record.uid.clone(), record);
        }
        Ok(None)
    }

    fn get(&self, uid: &AttestationUid) -> VouchResult<Option<AttestationRecord>> {
        let records = lock_records(&self.records)?;
        Ok(records.get(uid).cloned())
    }

    fn mark_revoked(&self, uid: &AttestationUid, at: Timestamp) -> VouchResult<bool> {
        let mut records = lock_records(&self.records)?;
        let record = records.get_mut(uid).ok_or_else(|| missing(uid))?;
        if record.revoked_at.is_some() {
            return Ok(false);
        }
        record.revoked_at = Some(at);
        Ok(true)
    }

    fn mark_all_revoked(
        &self,
        uids: &[AttestationUid],
        at: Timestamp,
    ) -> VouchResult<Vec<AttestationUid>> {
        let mut records = lock_records(&self.records)?;
        if let Some(uid) = uids.iter().find(|uid| !records.contains_key(*uid)) {
            return Err(missing(uid));
        }
        let mut already = Vec::new();
        for uid in uids {
            if let Some(record) = records.get_mut(uid) {
                match record.revoked_at {
                    Some(_) => already.push(uid.clone()),
                    None => record.revoked_at = Some(at),
                }
            }
        }
        Ok(already)
    }

    fn list_by_subject(&self, subject: &SubjectId) -> VouchResult<Vec<AttestationRecord>> {
        let records = lock_records(&self.records)?;
        let mut found: Vec<AttestationRecord> = records
            .values()
            .filter(|r| &r.subject == subject)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then_with(|| a.uid.cmp(&b.uid)));
        Ok(found)
    }

    fn count(&self) -> VouchResult<usize> {
        Ok(lock_records(&self.records)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vouch_core::{FixedHash, SchemaId};

    fn record(uid: &str, subject: &str, issued: u64) -> AttestationRecord {
        AttestationRecord {
            uid: AttestationUid::new(uid),
            schema_id: SchemaId::new("s"),
            record_type: "forecast".into(),
            subject: SubjectId::new(subject),
            issued_at: Timestamp::from_seconds(issued),
            revocable: true,
            revoked_at: None,
            expiration: None,
            root: FixedHash([1; 32]),
            field_count: 1,
            witness: None,
        }
    }

    #[test]
    fn test_insert_is_append_only() {
        let store = InMemoryRecordStore::new();
        assert!(store.insert(record("u1", "alice", 1)).unwrap());
        assert!(!store.insert(record("u1", "bob", 2)).unwrap());
        let stored = store.get(&AttestationUid::new("u1")).unwrap().unwrap();
        assert_eq!(stored.subject.as_str(), "alice");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_mark_revoked_once() {
        let store = InMemoryRecordStore::new();
        store.insert(record("u1", "alice", 1)).unwrap();
        let uid = AttestationUid::new("u1");

        assert!(store.mark_revoked(&uid, Timestamp::from_seconds(5)).unwrap());
        assert!(!store.mark_revoked(&uid, Timestamp::from_seconds(6)).unwrap());
        let stored = store.get(&uid).unwrap().unwrap();
        assert_eq!(stored.revoked_at, Some(Timestamp::from_seconds(5)));

        assert!(store
            .mark_revoked(&AttestationUid::new("nope"), Timestamp::from_seconds(1))
            .is_err());
    }

    #[test]
    fn test_mark_all_revoked_marks_the_rest_and_reports_conflicts() {
        let store = InMemoryRecordStore::new();
        store.insert(record("u1", "alice", 1)).unwrap();
        store.insert(record("u2", "alice", 2)).unwrap();
        let u1 = AttestationUid::new("u1");
        let u2 = AttestationUid::new("u2");
        store.mark_revoked(&u2, Timestamp::from_seconds(3)).unwrap();

        let already = store
            .mark_all_revoked(&[u1.clone(), u2.clone()], Timestamp::from_seconds(4))
            .unwrap();
        assert_eq!(already, vec![u2.clone()]);
        assert_eq!(
            store.get(&u1).unwrap().unwrap().revoked_at,
            Some(Timestamp::from_seconds(4))
        );
        // The earlier revocation keeps its timestamp.
        assert_eq!(
            store.get(&u2).unwrap().unwrap().revoked_at,
            Some(Timestamp::from_seconds(3))
        );
    }

    #[test]
    fn test_mark_all_revoked_unknown_uid_marks_nothing() {
        let store = InMemoryRecordStore::new();
        store.insert(record("u1", "alice", 1)).unwrap();
        let u1 = AttestationUid::new("u1");

        assert!(store
            .mark_all_revoked(&[u1.clone(), AttestationUid::new("nope")], Timestamp::from_seconds(4))
            .is_err());
        assert_eq!(store.get(&u1).unwrap().unwrap().revoked_at, None);
    }

    #[test]
    fn test_insert_all_is_all_or_nothing() {
        let store = InMemoryRecordStore::new();
        store.insert(record("u2", "alice", 1)).unwrap();
        let conflict = store
            .insert_all(vec![record("u1", "alice", 2), record("u2", "alice", 3)])
            .unwrap();
        assert_eq!(conflict, Some(AttestationUid::new("u2")));
        assert!(store.get(&AttestationUid::new("u1")).unwrap().is_none());
    }

    #[test]
    fn test_list_by_subject_sorted_by_issue_time() {
        let store = InMemoryRecordStore::new();
        store.insert(record("u3", "alice", 30)).unwrap();
        store.insert(record("u1", "alice", 10)).unwrap();
        store.insert(record("u2", "bob", 20)).unwrap();

        let alice = store.list_by_subject(&SubjectId::new("alice")).unwrap();
        let uids: Vec<&str> = alice.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, vec!["u1", "u3"]);
    }

    #[test]
    fn test_concurrent_revocation_has_single_winner() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.insert(record("u1", "alice", 1)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .mark_revoked(&AttestationUid::new("u1"), Timestamp::from_seconds(i))
                        .unwrap()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
