//! A programmable in-memory registry. Status lists are resolved at or
//! before the requested timestamp, and every status list fetch is counted
//! so tests can assert on request coalescing.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use anoncreds_types::{
    identifiers::{CredentialDefinitionId, RevocationRegistryDefinitionId, SchemaId},
    ledger::{
        cred_def::CredentialDefinition, rev_reg_def::RevocationRegistryDefinition,
        rev_status_list::RevocationStatusList, schema::Schema,
    },
};
use async_trait::async_trait;
use credflow_vdr::{
    error::{VdrError, VdrResult},
    AnoncredsVdrRead, TailsFileService,
};

#[derive(Debug, Default)]
pub struct MockVdr {
    schemas: Mutex<HashMap<SchemaId, Schema>>,
    cred_defs: Mutex<HashMap<CredentialDefinitionId, CredentialDefinition>>,
    rev_reg_defs: Mutex<HashMap<RevocationRegistryDefinitionId, RevocationRegistryDefinition>>,
    status_lists: Mutex<HashMap<RevocationRegistryDefinitionId, Vec<RevocationStatusList>>>,
    status_list_fetches: AtomicUsize,
}

impl MockVdr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, schema: Schema) -> Self {
        self.schemas
            .lock()
            .unwrap()
            .insert(schema.id.clone(), schema);
        self
    }

    pub fn with_cred_def(self, cred_def: CredentialDefinition) -> Self {
        self.cred_defs
            .lock()
            .unwrap()
            .insert(cred_def.id.clone(), cred_def);
        self
    }

    pub fn with_rev_reg_def(self, def: RevocationRegistryDefinition) -> Self {
        self.rev_reg_defs
            .lock()
            .unwrap()
            .insert(def.id.clone(), def);
        self
    }

    /// Publishes a status list version; versions may be added in any order.
    pub fn with_status_list(self, list: RevocationStatusList) -> Self {
        self.status_lists
            .lock()
            .unwrap()
            .entry(list.rev_reg_def_id.clone())
            .or_default()
            .push(list);
        self
    }

    /// How many status list fetches reached the registry.
    pub fn status_list_fetch_count(&self) -> usize {
        self.status_list_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnoncredsVdrRead for MockVdr {
    async fn get_schema(&self, schema_id: &SchemaId) -> VdrResult<Schema> {
        self.schemas
            .lock()
            .unwrap()
            .get(schema_id)
            .cloned()
            .ok_or_else(|| VdrError::ObjectNotFound(schema_id.to_string()))
    }

    async fn get_cred_def(
        &self,
        cred_def_id: &CredentialDefinitionId,
    ) -> VdrResult<CredentialDefinition> {
        self.cred_defs
            .lock()
            .unwrap()
            .get(cred_def_id)
            .cloned()
            .ok_or_else(|| VdrError::ObjectNotFound(cred_def_id.to_string()))
    }

    async fn get_rev_reg_def(
        &self,
        rev_reg_def_id: &RevocationRegistryDefinitionId,
    ) -> VdrResult<RevocationRegistryDefinition> {
        self.rev_reg_defs
            .lock()
            .unwrap()
            .get(rev_reg_def_id)
            .cloned()
            .ok_or_else(|| VdrError::ObjectNotFound(rev_reg_def_id.to_string()))
    }

    async fn get_rev_status_list(
        &self,
        rev_reg_def_id: &RevocationRegistryDefinitionId,
        timestamp: u64,
    ) -> VdrResult<RevocationStatusList> {
        self.status_list_fetches.fetch_add(1, Ordering::SeqCst);
        self.status_lists
            .lock()
            .unwrap()
            .get(rev_reg_def_id)
            .and_then(|versions| {
                versions
                    .iter()
                    .filter(|list| list.timestamp <= timestamp)
                    .max_by_key(|list| list.timestamp)
            })
            .cloned()
            .ok_or_else(|| {
                VdrError::ObjectNotFound(format!("{rev_reg_def_id} at or before {timestamp}"))
            })
    }
}

#[derive(Debug, Default)]
pub struct MockTailsFileService;

#[async_trait]
impl TailsFileService for MockTailsFileService {
    async fn download_tails_file(
        &self,
        rev_reg_def: &RevocationRegistryDefinition,
    ) -> VdrResult<PathBuf> {
        Ok(PathBuf::from(format!(
            "/tmp/tails/{}",
            rev_reg_def.value.tails_hash
        )))
    }
}
