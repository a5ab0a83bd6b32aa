//! Shared test doubles: programmable ledger, anoncreds collaborators and
//! an in-memory message store.

pub mod fixtures;
pub mod mock_anoncreds;
pub mod mock_store;
pub mod mock_vdr;
