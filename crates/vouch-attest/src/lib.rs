//! Vouch Attest
//!
//! Wraps the commitment primitives from `vouch-proof` with record identity
//! (schema, subject, issuance, revocation, expiration) and delegates
//! publication to a ledger collaborator.
//!
//! State machine per record:
//!
//! ```text
//! Created -> Active -> Revoked   (stored, terminal)
//!                   -> Expired   (derived from time, terminal)
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod status;
pub mod store;
pub mod types;
pub mod witness;

pub use config::AttestConfig;
pub use error::{LifecycleError, LifecycleResult};
pub use ledger::{ledger_uid, InMemoryLedger};
pub use manager::{AttestationManager, LedgerVerification};
pub use status::AttestationStatus;
pub use store::{InMemoryRecordStore, RecordStore};
pub use types::{
    AttestationRecord, AttestationView, CreateOptions, CreateRequest, Disclosure, Witness,
};
pub use witness::{verify_witness, witness_message, Ed25519Signer};
