//! Vouch core: digests, timestamps, typed identifiers and the collaborator
//! traits (ledger publisher/reader, message signer) the attestation engine
//! consumes.

pub mod crypto;
pub mod error;
pub mod traits;
pub mod types;

pub use crypto::*;
pub use error::*;
pub use traits::*;
pub use types::*;
