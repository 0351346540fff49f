//! Tamper-evident, hash-chained, signed audit log for the agent
//! interaction gateway.
//!
//! Every decided action becomes one [`InteractionRecord`], sealed by a
//! [`RecordSealer`] into a per-`(org_id, uapk_id)` hash chain and signed
//! with the gateway's Ed25519 key. [`verify_chain`] walks a chain back
//! and reports every break it finds.

mod error;
mod hashing;
mod record;
mod seal;
mod store;
mod verify;

pub use error::AuditError;
pub use hashing::{compute_record_hash, hash_payload};
pub use record::{
    generate_record_id, CheckOutcome, Decision, InteractionRecord, PolicyCheckStep, PolicyTrace,
    Reason,
};
pub use seal::{PendingRecord, RecordSealer};
pub use store::AuditStore;
pub use verify::{verify_chain, VerificationError, VerificationReport};
