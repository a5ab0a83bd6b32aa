//! Data types of the anoncreds credential format: proof requests and
//! presentations, ledger objects, identifiers and attribute value encoding.

pub mod comparison;
pub mod credential;
pub mod encoding;
pub mod error;
pub mod identifiers;
pub mod ledger;
pub mod nonce;
pub mod pres_request;
pub mod presentation;

pub use error::{Error, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;
