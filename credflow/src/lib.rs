//! Credential exchange over DIDComm: message dispatch, format-agnostic
//! issuance and presentation coordinators, the anoncreds format services
//! and revocation-aware proof request handling.

pub mod anoncreds;
pub mod dispatch;
pub mod errors;
pub mod formats;
pub mod ledger;
pub mod presentation_exchange;
pub mod protocols;
pub mod revocation;
pub mod storage;

pub use credflow_messages as messages;
pub use credflow_vdr as vdr;
