//! Read access to a verifiable data registry, abstracted behind traits so
//! exchanges can run against any ledger implementation.

pub mod error;

use std::{fmt::Debug, path::PathBuf};

use anoncreds_types::{
    identifiers::{CredentialDefinitionId, RevocationRegistryDefinitionId, SchemaId},
    ledger::{
        cred_def::CredentialDefinition, rev_reg_def::RevocationRegistryDefinition,
        rev_status_list::RevocationStatusList, schema::Schema,
    },
};
use async_trait::async_trait;

use crate::error::VdrResult;

#[async_trait]
pub trait AnoncredsVdrRead: Debug + Send + Sync {
    async fn get_schema(&self, schema_id: &SchemaId) -> VdrResult<Schema>;

    async fn get_cred_def(
        &self,
        cred_def_id: &CredentialDefinitionId,
    ) -> VdrResult<CredentialDefinition>;

    async fn get_rev_reg_def(
        &self,
        rev_reg_def_id: &RevocationRegistryDefinitionId,
    ) -> VdrResult<RevocationRegistryDefinition>;

    /// Resolves the registry state closest to (at or before) `timestamp`.
    /// The returned list carries the timestamp it was actually published
    /// at, which may be earlier than the one requested.
    async fn get_rev_status_list(
        &self,
        rev_reg_def_id: &RevocationRegistryDefinitionId,
        timestamp: u64,
    ) -> VdrResult<RevocationStatusList>;
}

/// Local cache of tails files, downloaded on demand from the location
/// recorded in the registry definition.
#[async_trait]
pub trait TailsFileService: Debug + Send + Sync {
    async fn download_tails_file(
        &self,
        rev_reg_def: &RevocationRegistryDefinition,
    ) -> VdrResult<PathBuf>;
}
