use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};
use vouch_core::{
    AttestationUid, FixedHash, LedgerPublisher, LedgerReader, MessageSigner, PublishRequest,
    SubjectId, Timestamp, VouchError, VouchResult,
};
use vouch_proof::{build_tree, verify_proof_report, Proof, Tree, VerificationReport};

use crate::config::AttestConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::ledger::InMemoryLedger;
use crate::status::{check_revocable, AttestationStatus};
use crate::store::{InMemoryRecordStore, RecordStore};
use crate::types::{AttestationRecord, AttestationView, CreateRequest, Disclosure, Witness};
use crate::witness::{witness_message, witness_uid};

/// A request whose tree is built and whose publication payload is final.
struct Prepared {
    record_type: String,
    field_count: u32,
    publish: PublishRequest,
}

impl Prepared {
    fn into_record(
        self,
        uid: AttestationUid,
        issued_at: Timestamp,
        witness: Option<Witness>,
    ) -> AttestationRecord {
        AttestationRecord {
            uid,
            schema_id: self.publish.schema_id,
            record_type: self.record_type,
            subject: self.publish.subject,
            issued_at,
            revocable: self.publish.revocable,
            revoked_at: None,
            expiration: self.publish.expiration,
            root: self.publish.root,
            field_count: self.field_count,
            witness,
        }
    }
}

/// Outcome of checking a proof against the root a ledger holds for `uid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerVerification {
    pub uid: AttestationUid,
    pub ledger_root: FixedHash,
    pub status: AttestationStatus,
    pub report: VerificationReport,
}

impl LedgerVerification {
    /// The proof holds and the attestation is still active.
    pub fn is_valid(&self) -> bool {
        self.report.is_valid() && self.status == AttestationStatus::Active
    }
}

/// Creates, revokes and queries attestations.
///
/// Trees are always fully built before any collaborator call, and local
/// state only changes after the collaborator confirms. Every ledger call
/// is bounded by `AttestConfig::publish_timeout`; nothing is retried here.
pub struct AttestationManager {
    config: AttestConfig,
    publisher: Arc<dyn LedgerPublisher>,
    reader: Arc<dyn LedgerReader>,
    store: Arc<dyn RecordStore>,
}

impl AttestationManager {
    pub fn new(
        config: AttestConfig,
        publisher: Arc<dyn LedgerPublisher>,
        reader: Arc<dyn LedgerReader>,
        store: Arc<dyn RecordStore>,
    ) -> LifecycleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            publisher,
            reader,
            store,
        })
    }

    /// Manager over the in-memory ledger and record store.
    pub fn in_memory(config: AttestConfig, ledger: Arc<InMemoryLedger>) -> LifecycleResult<Self> {
        Self::new(
            config,
            ledger.clone(),
            ledger,
            Arc::new(InMemoryRecordStore::new()),
        )
    }

    pub fn config(&self) -> &AttestConfig {
        &self.config
    }

    /// Build the commitment tree for a record without publishing it.
    pub fn build_record(&self, fields: &[vouch_proof::Field]) -> LifecycleResult<Tree> {
        if fields.is_empty() {
            return Err(LifecycleError::EmptyRecord);
        }
        Ok(build_tree(fields)?)
    }

    // ----- Create -----

    /// Build the tree, publish its root and store the record.
    ///
    /// Publishing the same record again returns the stored record; the
    /// root is the idempotency key, so a retry after `PublishTimeout` is safe.
    pub async fn create(&self, request: &CreateRequest) -> LifecycleResult<AttestationRecord> {
        let prepared = self.prepare(request)?;
        let uid = self
            .call_ledger("publish", self.publisher.publish(&prepared.publish))
            .await?;
        let record = prepared.into_record(uid, Timestamp::now(), None);
        self.store_record(record)
    }

    /// Create a record attested by a signature over its root instead of a
    /// ledger entry. Witnessed records cannot be revoked.
    pub async fn create_witnessed(
        &self,
        request: &CreateRequest,
        signer: &dyn MessageSigner,
    ) -> LifecycleResult<AttestationRecord> {
        let mut prepared = self.prepare(request)?;
        prepared.publish.revocable = false;

        let issued_at = Timestamp::now();
        let message = witness_message(
            &prepared.publish.schema_id,
            &prepared.publish.subject,
            &prepared.publish.root,
            issued_at,
        );
        let signature = signer.sign(&message)?;
        let witness = Witness {
            public_key: signer.public_key(),
            signature,
        };

        let record = prepared.into_record(witness_uid(&message), issued_at, Some(witness));
        self.store_record(record)
    }

    /// Publish several records in one atomic ledger call.
    ///
    /// Only fully public records are accepted. Everything is validated and
    /// every tree built before the single collaborator call.
    pub async fn batch_create(
        &self,
        requests: &[CreateRequest],
    ) -> LifecycleResult<Vec<AttestationRecord>> {
        if requests.is_empty() {
            return Err(LifecycleError::EmptyBatch);
        }
        if !self.publisher.atomic_batches() {
            return Err(LifecycleError::BatchNotAtomic);
        }
        if let Some(position) = requests
            .iter()
            .position(|r| r.options.disclosure != Disclosure::Public)
        {
            return Err(LifecycleError::BatchDisclosureUnsupported { position });
        }

        let prepared = requests
            .iter()
            .map(|r| self.prepare(r))
            .collect::<LifecycleResult<Vec<_>>>()?;
        let publish: Vec<PublishRequest> = prepared.iter().map(|p| p.publish.clone()).collect();

        let uids = self
            .call_ledger("batch_publish", self.publisher.batch_publish(&publish))
            .await?;
        if uids.len() != prepared.len() {
            return Err(VouchError::Ledger(format!(
                "ledger returned {} uids for {} records",
                uids.len(),
                prepared.len()
            ))
            .into());
        }

        let issued_at = Timestamp::now();
        let records: Vec<AttestationRecord> = prepared
            .into_iter()
            .zip(uids)
            .map(|(p, uid)| p.into_record(uid, issued_at, None))
            .collect();

        match self.store.insert_all(records.clone())? {
            None => {
                info!(count = records.len(), "attestation batch created");
                Ok(records)
            }
            // A retried batch: return what was stored the first time.
            Some(existing) => {
                debug!(uid = %existing, "batch overlaps stored records");
                records
                    .into_iter()
                    .map(|r| self.store_record(r))
                    .collect()
            }
        }
    }

    fn prepare(&self, request: &CreateRequest) -> LifecycleResult<Prepared> {
        let schema_id = self.config.schema_for(&request.record_type)?.clone();
        if request.fields.is_empty() {
            return Err(LifecycleError::EmptyRecord);
        }
        let tree = build_tree(&request.fields)?;

        let public_data = match request.options.disclosure {
            Disclosure::Public => Some(
                serde_json::to_vec(&request.fields)
                    .map_err(|e| VouchError::Serialization(e.to_string()))?,
            ),
            Disclosure::Private => None,
        };

        Ok(Prepared {
            record_type: request.record_type.clone(),
            field_count: tree.leaf_count() as u32,
            publish: PublishRequest {
                schema_id,
                subject: request.subject.clone(),
                root: tree.root(),
                revocable: request.options.revocable,
                expiration: request.options.expiration,
                public_data,
            },
        })
    }

    fn store_record(&self, record: AttestationRecord) -> LifecycleResult<AttestationRecord> {
        if self.store.insert(record.clone())? {
            info!(
                uid = %record.uid,
                schema = %record.schema_id,
                subject = %record.subject,
                root = %record.root,
                witnessed = record.is_witnessed(),
                "attestation created"
            );
            return Ok(record);
        }
        debug!(uid = %record.uid, "attestation already stored");
        self.store
            .get(&record.uid)?
            .ok_or(LifecycleError::NotFound(record.uid))
    }

    // ----- Revoke -----

    /// Revoke on the ledger, then mark the stored record. Of two concurrent
    /// revocations of the same uid, exactly one succeeds.
    pub async fn revoke(&self, uid: &AttestationUid) -> LifecycleResult<()> {
        let record = self.get_record(uid)?;
        check_revocable(&record)?;

        self.call_ledger("revoke", self.publisher.revoke_on_ledger(uid))
            .await?;

        if !self.store.mark_revoked(uid, Timestamp::now())? {
            return Err(LifecycleError::AlreadyRevoked(uid.clone()));
        }
        info!(uid = %uid, "attestation revoked");
        Ok(())
    }

    /// Revoke several records in one atomic ledger call. Every uid is
    /// checked before the call; one bad uid rejects the whole batch.
    ///
    /// Once the ledger confirms, every uid still unrevoked locally is marked.
    /// A uid revoked by a concurrent call in the meantime is reported as
    /// `AlreadyRevoked`; the rest of the batch stays recorded.
    pub async fn batch_revoke(&self, uids: &[AttestationUid]) -> LifecycleResult<()> {
        if uids.is_empty() {
            return Err(LifecycleError::EmptyBatch);
        }
        if !self.publisher.atomic_batches() {
            return Err(LifecycleError::BatchNotAtomic);
        }

        let mut seen = HashSet::with_capacity(uids.len());
        for uid in uids {
            if !seen.insert(uid) {
                return Err(LifecycleError::AlreadyRevoked(uid.clone()));
            }
            check_revocable(&self.get_record(uid)?)?;
        }

        self.call_ledger("batch_revoke", self.publisher.batch_revoke(uids))
            .await?;

        let already = self.store.mark_all_revoked(uids, Timestamp::now())?;
        info!(
            count = uids.len() - already.len(),
            raced = already.len(),
            "attestation batch revoked"
        );
        match already.into_iter().next() {
            Some(uid) => Err(LifecycleError::AlreadyRevoked(uid)),
            None => Ok(()),
        }
    }

    // ----- Query -----

    pub fn query(&self, uid: &AttestationUid) -> LifecycleResult<AttestationView> {
        Ok(self.get_record(uid)?.into())
    }

    pub fn list_for_subject(&self, subject: &SubjectId) -> LifecycleResult<Vec<AttestationView>> {
        Ok(self
            .store
            .list_by_subject(subject)?
            .into_iter()
            .map(AttestationView::from)
            .collect())
    }

    /// Check `proof` against the root the ledger holds for `uid`.
    ///
    /// Needs only the proof and the ledger; the local store is not consulted.
    pub async fn verify_attested(
        &self,
        uid: &AttestationUid,
        proof: &Proof,
    ) -> LifecycleResult<LedgerVerification> {
        let entry = self
            .call_ledger("fetch_record", self.reader.fetch_record(uid))
            .await?
            .ok_or_else(|| LifecycleError::NotFound(uid.clone()))?;

        let status = AttestationStatus::derive(entry.revoked_at, entry.expiration, Timestamp::now());
        let report = verify_proof_report(proof, &entry.root);
        if status != AttestationStatus::Active {
            warn!(uid = %uid, status = %status, "proof checked against inactive attestation");
        }

        Ok(LedgerVerification {
            uid: uid.clone(),
            ledger_root: entry.root,
            status,
            report,
        })
    }

    fn get_record(&self, uid: &AttestationUid) -> LifecycleResult<AttestationRecord> {
        self.store
            .get(uid)?
            .ok_or_else(|| LifecycleError::NotFound(uid.clone()))
    }

    async fn call_ledger<T, F>(&self, op: &'static str, call: F) -> LifecycleResult<T>
    where
        F: Future<Output = VouchResult<T>>,
    {
        let timeout_ms = self.config.publish_timeout_ms;
        match tokio::time::timeout(self.config.publish_timeout(), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(VouchError::Timeout)) | Err(_) => {
                warn!(op, timeout_ms, "ledger call timed out");
                Err(LifecycleError::PublishTimeout { timeout_ms })
            }
            Ok(Err(e)) => {
                warn!(op, error = %e, "ledger call failed");
                Err(LifecycleError::Collaborator(e))
            }
        }
    }
}

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<AttestationManager>();
    }
    let _ = check;
};
