//! The anoncreds cryptographic operations this crate orchestrates but does
//! not implement, abstracted behind traits.

use std::{collections::HashMap, fmt::Debug, path::Path};

use anoncreds_types::{
    credential::{CredentialInfo, RequestedCredentials},
    identifiers::{CredentialDefinitionId, RevocationRegistryDefinitionId, SchemaId},
    ledger::{
        cred_def::CredentialDefinition, rev_reg_def::RevocationRegistryDefinition,
        rev_status_list::RevocationStatusList, schema::Schema,
    },
    nonce::Nonce,
    pres_request::PresentationRequestPayload,
    presentation::Presentation,
};
use async_trait::async_trait;
use serde_json::Value;

use crate::errors::CredflowResult;

pub type SchemasMap = HashMap<SchemaId, Schema>;
pub type CredDefsMap = HashMap<CredentialDefinitionId, CredentialDefinition>;
pub type RevRegDefsMap = HashMap<RevocationRegistryDefinitionId, RevocationRegistryDefinition>;

#[async_trait]
pub trait AnonCredsIssuer: Debug + Send + Sync {
    async fn create_credential_offer(
        &self,
        cred_def_id: &CredentialDefinitionId,
    ) -> CredflowResult<Value>;

    async fn create_credential(
        &self,
        offer: &Value,
        request: &Value,
        values: &HashMap<String, String>,
    ) -> CredflowResult<Value>;
}

#[async_trait]
pub trait AnonCredsHolder: Debug + Send + Sync {
    /// Returns the credential request and the request metadata needed
    /// later to store the issued credential.
    async fn create_credential_request(
        &self,
        offer: &Value,
        cred_def: &CredentialDefinition,
    ) -> CredflowResult<(Value, Value)>;

    /// Stores an issued credential, returning its referent.
    async fn store_credential(
        &self,
        request_metadata: &Value,
        credential: &Value,
        cred_def: &CredentialDefinition,
    ) -> CredflowResult<String>;

    /// The stored credentials able to answer one referent of the request.
    async fn get_credentials_for_proof_request(
        &self,
        request: &PresentationRequestPayload,
        referent: &str,
    ) -> CredflowResult<Vec<CredentialInfo>>;

    async fn create_revocation_state(
        &self,
        tails_path: &Path,
        rev_reg_def: &RevocationRegistryDefinition,
        status_list: &RevocationStatusList,
        cred_rev_id: &str,
    ) -> CredflowResult<Value>;

    /// `rev_states` maps registry id to timestamp to revocation state.
    async fn create_presentation(
        &self,
        request: &PresentationRequestPayload,
        credentials: &RequestedCredentials,
        schemas: &SchemasMap,
        cred_defs: &CredDefsMap,
        rev_states: &Value,
    ) -> CredflowResult<Presentation>;
}

#[async_trait]
pub trait AnonCredsVerifier: Debug + Send + Sync {
    async fn generate_nonce(&self) -> CredflowResult<Nonce>;

    async fn verify_presentation(
        &self,
        request: &PresentationRequestPayload,
        presentation: &Presentation,
        schemas: &SchemasMap,
        cred_defs: &CredDefsMap,
        rev_reg_defs: &RevRegDefsMap,
        rev_status_lists: &[RevocationStatusList],
    ) -> CredflowResult<bool>;
}
