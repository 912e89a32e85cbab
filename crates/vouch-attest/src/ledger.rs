//! In-memory reference ledger.
//!
//! Implements both collaborator traits with the contract real ledgers must
//! honour: no internal retries, all-or-nothing batches when advertised, and
//! the same uid for a repeated `(schema, subject, root)` publication.
//! Call counting, failure injection and artificial latency make it usable
//! as a test double.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;
use vouch_core::{
    sha256_concat, AttestationUid, LedgerEntry, LedgerPublisher, LedgerReader, PublishRequest,
    Timestamp, VouchError, VouchResult,
};

const UID_DOMAIN: &[u8] = b"vouch.ledger.uid.v1";

#[derive(Default)]
struct LedgerState {
    entries: HashMap<AttestationUid, LedgerEntry>,
    public_data: HashMap<AttestationUid, Vec<u8>>,
}

pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    failures: Mutex<VecDeque<VouchError>>,
    calls: AtomicUsize,
    latency_ms: AtomicU64,
    atomic: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> VouchResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| VouchError::Ledger(format!("mutex poisoned: {}", e)))
}

/// Deterministic uid for a publication: the idempotency key is the root.
pub fn ledger_uid(request: &PublishRequest) -> AttestationUid {
    let digest = sha256_concat(&[
        UID_DOMAIN,
        request.schema_id.as_str().as_bytes(),
        &[0],
        request.subject.as_str().as_bytes(),
        &[0],
        request.root.as_bytes(),
    ]);
    AttestationUid::new(format!("0x{}", digest.to_hex()))
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            latency_ms: AtomicU64::new(0),
            atomic: AtomicBool::new(true),
        }
    }

    /// Queue an error; the next call (of any kind) returns it, FIFO.
    pub fn inject_failure(&self, error: VouchError) {
        if let Ok(mut queue) = self.failures.lock() {
            queue.push_back(error);
        }
    }

    /// Delay every call by `latency` before it takes effect.
    pub fn set_latency(&self, latency: Duration) {
        let ms = latency.as_millis().try_into().unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    pub fn set_atomic_batches(&self, atomic: bool) {
        self.atomic.store(atomic, Ordering::SeqCst);
    }

    /// Number of collaborator calls received, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn entry_count(&self) -> usize {
        lock(&self.state).map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn public_data(&self, uid: &AttestationUid) -> Option<Vec<u8>> {
        lock(&self.state)
            .ok()
            .and_then(|s| s.public_data.get(uid).cloned())
    }

    /// Common prologue: count, wait, then fail if an error is queued.
    async fn enter(&self) -> VouchResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        match lock(&self.failures)?.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply_publish(state: &mut LedgerState, request: &PublishRequest) -> AttestationUid {
        let uid = ledger_uid(request);
        if !state.entries.contains_key(&uid) {
            state.entries.insert(
                uid.clone(),
                LedgerEntry {
                    uid: uid.clone(),
                    schema_id: request.schema_id.clone(),
                    subject: request.subject.clone(),
                    root: request.root,
                    issued_at: Timestamp::now(),
                    revoked_at: None,
                    expiration: request.expiration,
                },
            );
            if let Some(data) = &request.public_data {
                state.public_data.insert(uid.clone(), data.clone());
            }
        }
        uid
    }

    fn check_revocable(state: &LedgerState, uid: &AttestationUid) -> VouchResult<()> {
        if state.entries.contains_key(uid) {
            Ok(())
        } else {
            Err(VouchError::Rejected(format!("unknown attestation {}", uid)))
        }
    }

    fn apply_revoke(state: &mut LedgerState, uid: &AttestationUid, at: Timestamp) {
        if let Some(entry) = state.entries.get_mut(uid) {
            entry.revoked_at.get_or_insert(at);
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerPublisher for InMemoryLedger {
    async fn publish(&self, request: &PublishRequest) -> VouchResult<AttestationUid> {
        self.enter().await?;
        let mut state = lock(&self.state)?;
        let uid = Self::apply_publish(&mut state, request);
        debug!(uid = %uid, schema = %request.schema_id, "ledger publish");
        Ok(uid)
    }

    async fn revoke_on_ledger(&self, uid: &AttestationUid) -> VouchResult<()> {
        self.enter().await?;
        let mut state = lock(&self.state)?;
        Self::check_revocable(&state, uid)?;
        Self::apply_revoke(&mut state, uid, Timestamp::now());
        debug!(uid = %uid, "ledger revoke");
        Ok(())
    }

    async fn batch_publish(&self, requests: &[PublishRequest]) -> VouchResult<Vec<AttestationUid>> {
        self.enter().await?;
        let mut state = lock(&self.state)?;
        let uids: Vec<AttestationUid> = requests
            .iter()
            .map(|r| Self::apply_publish(&mut state, r))
            .collect();
        debug!(count = uids.len(), "ledger batch publish");
        Ok(uids)
    }

    async fn batch_revoke(&self, uids: &[AttestationUid]) -> VouchResult<()> {
        self.enter().await?;
        let mut state = lock(&self.state)?;
        for uid in uids {
            Self::check_revocable(&state, uid)?;
        }
        let now = Timestamp::now();
        for uid in uids {
            Self::apply_revoke(&mut state, uid, now);
        }
        debug!(count = uids.len(), "ledger batch revoke");
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        self.atomic.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn fetch_record(&self, uid: &AttestationUid) -> VouchResult<Option<LedgerEntry>> {
        self.enter().await?;
        let state = lock(&self.state)?;
        Ok(state.entries.get(uid).cloned())
    }
}

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<InMemoryLedger>();
    }
    let _ = check;
};
