//! The anoncreds implementations of the format services.

pub mod credential;
pub mod proof;

pub const ANONCREDS_FILTER_FORMAT: &str = "anoncreds/credential-filter@v1.0";
pub const ANONCREDS_OFFER_FORMAT: &str = "anoncreds/credential-offer@v1.0";
pub const ANONCREDS_REQUEST_FORMAT: &str = "anoncreds/credential-request@v1.0";
pub const ANONCREDS_CREDENTIAL_FORMAT: &str = "anoncreds/credential@v1.0";
pub const ANONCREDS_PROOF_REQUEST_FORMAT: &str = "anoncreds/proof-request@v1.0";
pub const ANONCREDS_PROOF_FORMAT: &str = "anoncreds/proof@v1.0";
