//! Test doubles for the anoncreds collaborator traits. No cryptography
//! happens here: the mocks produce structurally faithful objects so the
//! orchestration around them can be exercised.

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use anoncreds_types::{
    credential::{CredentialInfo, RequestedCredentials},
    encoding::encode_credential_attribute,
    identifiers::CredentialDefinitionId,
    ledger::{
        cred_def::CredentialDefinition, rev_reg_def::RevocationRegistryDefinition,
        rev_status_list::RevocationStatusList,
    },
    nonce::Nonce,
    pres_request::PresentationRequestPayload,
    presentation::{
        AttributeValue, Identifier, Presentation, RequestedProof, RevealedAttributeGroupInfo,
        RevealedAttributeInfo, SubProofReferent,
    },
};
use async_trait::async_trait;
use credflow::{
    anoncreds::{AnonCredsHolder, AnonCredsIssuer, AnonCredsVerifier, CredDefsMap, RevRegDefsMap, SchemasMap},
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
};
use serde_json::{json, Value};

#[derive(Debug, Default)]
pub struct MockIssuer;

#[async_trait]
impl AnonCredsIssuer for MockIssuer {
    async fn create_credential_offer(
        &self,
        cred_def_id: &CredentialDefinitionId,
    ) -> CredflowResult<Value> {
        Ok(json!({
            "cred_def_id": cred_def_id.0,
            "nonce": "111111111111",
            "key_correctness_proof": {},
        }))
    }

    async fn create_credential(
        &self,
        offer: &Value,
        _request: &Value,
        values: &HashMap<String, String>,
    ) -> CredflowResult<Value> {
        Ok(json!({
            "cred_def_id": offer["cred_def_id"],
            "values": values,
            "signature": {},
        }))
    }
}

/// A holder with a fixed set of stored credentials, returned as candidates
/// for every referent.
#[derive(Debug, Default)]
pub struct MockHolder {
    credentials: Vec<CredentialInfo>,
    stored: AtomicUsize,
}

impl MockHolder {
    pub fn with_credentials(credentials: Vec<CredentialInfo>) -> Self {
        Self {
            credentials,
            stored: AtomicUsize::new(0),
        }
    }

    fn credential(&self, referent: &str) -> CredflowResult<&CredentialInfo> {
        self.credentials
            .iter()
            .find(|credential| credential.referent == referent)
            .ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::InvalidState,
                    format!("Mock holder has no credential {referent}"),
                )
            })
    }
}

#[async_trait]
impl AnonCredsHolder for MockHolder {
    async fn create_credential_request(
        &self,
        offer: &Value,
        cred_def: &CredentialDefinition,
    ) -> CredflowResult<(Value, Value)> {
        let request = json!({
            "cred_def_id": cred_def.id.0,
            "blinded_ms": {},
            "nonce": offer["nonce"],
        });
        let metadata = json!({ "master_secret_name": "main" });
        Ok((request, metadata))
    }

    async fn store_credential(
        &self,
        _request_metadata: &Value,
        _credential: &Value,
        _cred_def: &CredentialDefinition,
    ) -> CredflowResult<String> {
        let index = self.stored.fetch_add(1, Ordering::SeqCst);
        Ok(format!("stored-cred-{index}"))
    }

    async fn get_credentials_for_proof_request(
        &self,
        _request: &PresentationRequestPayload,
        _referent: &str,
    ) -> CredflowResult<Vec<CredentialInfo>> {
        Ok(self.credentials.clone())
    }

    async fn create_revocation_state(
        &self,
        _tails_path: &Path,
        rev_reg_def: &RevocationRegistryDefinition,
        status_list: &RevocationStatusList,
        cred_rev_id: &str,
    ) -> CredflowResult<Value> {
        Ok(json!({
            "rev_reg_id": rev_reg_def.id.0,
            "cred_rev_id": cred_rev_id,
            "timestamp": status_list.timestamp,
            "witness": {},
        }))
    }

    async fn create_presentation(
        &self,
        request: &PresentationRequestPayload,
        credentials: &RequestedCredentials,
        _schemas: &SchemasMap,
        _cred_defs: &CredDefsMap,
        _rev_states: &Value,
    ) -> CredflowResult<Presentation> {
        let mut identifiers: Vec<Identifier> = Vec::new();
        let mut sub_proof_indices: HashMap<String, u32> = HashMap::new();
        let mut requested_proof = RequestedProof::default();

        let mut index_of = |credential: &CredentialInfo,
                            timestamp: Option<u64>,
                            identifiers: &mut Vec<Identifier>| {
            *sub_proof_indices
                .entry(credential.referent.clone())
                .or_insert_with(|| {
                    identifiers.push(Identifier {
                        schema_id: credential.schema_id.clone(),
                        cred_def_id: credential.cred_def_id.clone(),
                        rev_reg_id: credential.rev_reg_id.clone(),
                        timestamp,
                    });
                    (identifiers.len() - 1) as u32
                })
        };

        for (referent, requested) in &credentials.requested_attributes {
            let credential = self.credential(&requested.cred_id)?;
            let sub_proof_index = index_of(credential, requested.timestamp, &mut identifiers);
            let info = request.requested_attributes.get(referent).ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::InvalidInput,
                    format!("Request has no attribute group {referent}"),
                )
            })?;

            let raw_value = |name: &str| {
                credential
                    .attrs
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| "missing".to_owned())
            };
            if let Some(names) = &info.names {
                let mut values = HashMap::new();
                for name in names {
                    let raw = raw_value(name);
                    let encoded = encode_credential_attribute(&raw);
                    values.insert(name.clone(), AttributeValue { raw, encoded });
                }
                requested_proof.revealed_attr_groups.insert(
                    referent.clone(),
                    RevealedAttributeGroupInfo {
                        sub_proof_index,
                        values,
                    },
                );
            } else if let Some(name) = &info.name {
                let raw = raw_value(name);
                let encoded = encode_credential_attribute(&raw);
                requested_proof.revealed_attrs.insert(
                    referent.clone(),
                    RevealedAttributeInfo {
                        sub_proof_index,
                        raw,
                        encoded,
                    },
                );
            }
        }

        for (referent, requested) in &credentials.requested_predicates {
            let credential = self.credential(&requested.cred_id)?;
            let sub_proof_index = index_of(credential, requested.timestamp, &mut identifiers);
            requested_proof
                .predicates
                .insert(referent.clone(), SubProofReferent { sub_proof_index });
        }

        Ok(Presentation {
            proof: json!({}),
            requested_proof,
            identifiers,
        })
    }
}

/// A verifier with a programmable verdict, recording the request it was
/// last asked to verify.
#[derive(Debug)]
pub struct MockVerifier {
    verdict: AtomicBool,
    nonces: AtomicUsize,
    last_request: Mutex<Option<PresentationRequestPayload>>,
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self {
            verdict: AtomicBool::new(true),
            nonces: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }
}

impl MockVerifier {
    pub fn rejecting() -> Self {
        let verifier = Self::default();
        verifier.verdict.store(false, Ordering::SeqCst);
        verifier
    }

    /// The request passed to the last `verify_presentation` call, after
    /// any interval overrides were applied.
    pub fn last_verified_request(&self) -> Option<PresentationRequestPayload> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnonCredsVerifier for MockVerifier {
    async fn generate_nonce(&self) -> CredflowResult<Nonce> {
        let index = self.nonces.fetch_add(1, Ordering::SeqCst);
        Nonce::from_dec(format!("9{index:019}"))
            .map_err(|err| CredflowError::from_msg(CredflowErrorKind::UnknownError, err))
    }

    async fn verify_presentation(
        &self,
        request: &PresentationRequestPayload,
        _presentation: &Presentation,
        _schemas: &SchemasMap,
        _cred_defs: &CredDefsMap,
        _rev_reg_defs: &RevRegDefsMap,
        _rev_status_lists: &[RevocationStatusList],
    ) -> CredflowResult<bool> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(self.verdict.load(Ordering::SeqCst))
    }
}
