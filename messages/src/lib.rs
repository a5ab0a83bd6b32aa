//! DIDComm v1 message typing for the credflow exchange protocols.
//!
//! The crate is split the same way the wire format is: [`msg_types`] deals
//! with the `@type` URI (parsing, version tolerance, the protocol
//! registry), [`decorators`] with the `~thread` / `~attach` style
//! decorators, and [`msg_fields`] with the per-protocol message bodies.

pub mod decorators;
pub mod errors;
pub mod misc;
pub mod msg_fields;
pub mod msg_types;
