//! Fan-out fetching of ledger objects referenced by a presentation or a
//! selection of credentials. Ids are deduplicated first; fetches run
//! concurrently and the first failure aborts the batch.

use std::collections::HashSet;

use anoncreds_types::identifiers::{CredentialDefinitionId, SchemaId};
use credflow_vdr::AnoncredsVdrRead;
use futures::future::try_join_all;

use crate::{
    anoncreds::{CredDefsMap, SchemasMap},
    errors::{CredflowError, CredflowResult},
};

pub async fn fetch_schemas(
    vdr: &dyn AnoncredsVdrRead,
    ids: impl IntoIterator<Item = SchemaId>,
) -> CredflowResult<SchemasMap> {
    let unique: HashSet<SchemaId> = ids.into_iter().collect();
    let fetched = try_join_all(unique.into_iter().map(|id| async move {
        let schema = vdr.get_schema(&id).await?;
        Ok::<_, CredflowError>((id, schema))
    }))
    .await?;
    Ok(fetched.into_iter().collect())
}

pub async fn fetch_cred_defs(
    vdr: &dyn AnoncredsVdrRead,
    ids: impl IntoIterator<Item = CredentialDefinitionId>,
) -> CredflowResult<CredDefsMap> {
    let unique: HashSet<CredentialDefinitionId> = ids.into_iter().collect();
    let fetched = try_join_all(unique.into_iter().map(|id| async move {
        let cred_def = vdr.get_cred_def(&id).await?;
        Ok::<_, CredflowError>((id, cred_def))
    }))
    .await?;
    Ok(fetched.into_iter().collect())
}
