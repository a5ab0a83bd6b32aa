//! Mapping of presentation-exchange definitions onto anonymous-credential
//! proof requests. The verifier speaks the generic presentation-exchange
//! vocabulary; this module translates a definition plus the holder's
//! submission into the typed proof request the anoncreds stack consumes,
//! along with the plan of which candidate credential answers which
//! referent.

use std::collections::{HashMap, HashSet};

use anoncreds_types::{
    credential::CredentialInfo,
    identifiers::{CredentialDefinitionId, SchemaId},
    nonce::Nonce,
    pres_request::{
        AttributeInfo, NonRevokedInterval, PredicateInfo, PredicateTypes,
        PresentationRequestPayload,
    },
};
use log::trace;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
    revocation::CredentialWithMetadata,
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PresentationDefinition {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub input_descriptors: Vec<InputDescriptor>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct InputDescriptor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Statuses>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Field {
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

/// The subset of JSON-schema numeric range keywords the mapping supports.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Filter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i32>,
    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<i32>,
    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<i32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Statuses {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<StatusConstraint>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StatusConstraint {
    pub directive: Directive,
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    Required,
    Allowed,
    Disallowed,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PresentationSubmission {
    pub id: String,
    pub definition_id: String,
    pub descriptor_map: Vec<DescriptorMapEntry>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DescriptorMapEntry {
    pub id: String,
    pub format: String,
    pub path: String,
}

/// One step of the selection plan: which candidate credential proves which
/// referent of the generated request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialProve {
    pub entry_index: usize,
    pub referent: String,
    pub is_predicate: bool,
    pub reveal: bool,
}

/// The generated request plus everything needed to fulfil it: the
/// selection plan, the credentials annotated with the revocation interval
/// that governs them, and the ledger objects to fetch.
#[derive(Debug)]
pub struct ProofRequestPlan {
    pub request: PresentationRequestPayload,
    pub prove: Vec<CredentialProve>,
    pub credentials: Vec<CredentialWithMetadata>,
    pub schema_ids: HashSet<SchemaId>,
    pub cred_def_ids: HashSet<CredentialDefinitionId>,
}

#[derive(Debug, Default)]
pub struct DataIntegrityPresentationBuilder;

impl DataIntegrityPresentationBuilder {
    /// Maps a presentation definition and the holder's submission onto a
    /// typed proof request. Each submission entry must name a definition
    /// descriptor and select exactly one candidate credential; ambiguous
    /// selection is rejected, not guessed.
    pub fn build_proof_request(
        &self,
        definition: &PresentationDefinition,
        submission: &PresentationSubmission,
        candidates: &[CredentialInfo],
    ) -> CredflowResult<ProofRequestPlan> {
        trace!(
            "build_proof_request >>> definition: {}, submission: {}",
            definition.id,
            submission.id
        );

        let mut requested_attributes: HashMap<String, AttributeInfo> = HashMap::new();
        let mut requested_predicates: HashMap<String, PredicateInfo> = HashMap::new();
        let mut prove = Vec::new();
        let mut credentials = Vec::new();
        let mut schema_ids = HashSet::new();
        let mut cred_def_ids = HashSet::new();

        let now = chrono::Utc::now().timestamp() as u64;
        let now_interval = NonRevokedInterval {
            from: Some(now),
            to: Some(now),
        };

        for entry in &submission.descriptor_map {
            let descriptor = definition
                .input_descriptors
                .iter()
                .find(|descriptor| descriptor.id == entry.id)
                .ok_or_else(|| {
                    CredflowError::from_msg(
                        CredflowErrorKind::DescriptorNotFound,
                        format!("Descriptor {} not found in presentation definition", entry.id),
                    )
                })?;

            let entry_index = resolve_credential_path(&entry.path, candidates.len())?;
            let credential = &candidates[entry_index];
            schema_ids.insert(credential.schema_id.clone());
            cred_def_ids.insert(credential.cred_def_id.clone());
            let restrictions =
                vec![serde_json::json!({ "cred_def_id": credential.cred_def_id.0 })];

            let constraints = descriptor.constraints.as_ref().ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::InvalidInput,
                    format!("Descriptor {} carries no constraints", descriptor.id),
                )
            })?;
            let fields = constraints.fields.as_deref().ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::InvalidInput,
                    format!("Descriptor {} constrains no fields", descriptor.id),
                )
            })?;

            let interval = if requires_revocation_status(constraints)? {
                if credential.rev_reg_id.is_none() {
                    return Err(CredflowError::from_msg(
                        CredflowErrorKind::InvalidInput,
                        format!(
                            "Descriptor {} demands revocation status but credential {} is not \
                             revocable",
                            descriptor.id, credential.referent
                        ),
                    ));
                }
                Some(now_interval.clone())
            } else {
                None
            };
            credentials.push(CredentialWithMetadata::new(
                credential.clone(),
                interval.clone(),
            ));

            let attribute_referent = format!("{}_attribute", entry.id);
            let predicate_referent_base = format!("{}_predicate", entry.id);
            let mut predicate_referent_index = 0;

            for field in fields {
                let Some(claim_name) = claim_name_for_field(field) else {
                    continue;
                };

                if let Some(filter) = &field.filter {
                    for (p_type, p_value) in predicate_bounds(filter) {
                        let referent =
                            format!("{predicate_referent_base}_{predicate_referent_index}");
                        predicate_referent_index += 1;

                        let mut predicate = PredicateInfo::builder()
                            .name(claim_name.clone())
                            .p_type(p_type)
                            .p_value(p_value)
                            .restrictions(restrictions.clone())
                            .build();
                        predicate.non_revoked = interval.clone();
                        requested_predicates.insert(referent.clone(), predicate);
                        prove.push(CredentialProve {
                            entry_index,
                            referent,
                            is_predicate: true,
                            reveal: true,
                        });
                    }
                } else {
                    match requested_attributes.get_mut(&attribute_referent) {
                        None => {
                            let mut attribute = AttributeInfo::builder()
                                .name(claim_name.clone())
                                .restrictions(restrictions.clone())
                                .build();
                            attribute.non_revoked = interval.clone();
                            requested_attributes.insert(attribute_referent.clone(), attribute);
                        }
                        Some(attribute) => {
                            // Second attribute field of the same descriptor
                            // upgrades the group to the names form.
                            let mut names = attribute.names.take().unwrap_or_default();
                            if let Some(name) = attribute.name.take() {
                                names.push(name);
                            }
                            names.push(claim_name.clone());
                            attribute.names = Some(names);
                        }
                    }
                    prove.push(CredentialProve {
                        entry_index,
                        referent: attribute_referent.clone(),
                        is_predicate: false,
                        reveal: true,
                    });
                }
            }
        }

        let request = PresentationRequestPayload::builder()
            .nonce(derive_nonce(&definition.id)?)
            .name(
                definition
                    .name
                    .clone()
                    .unwrap_or_else(|| "Proof request".to_owned()),
            )
            .version("1.0".to_owned())
            .requested_attributes(requested_attributes)
            .requested_predicates(requested_predicates)
            .build();

        Ok(ProofRequestPlan {
            request,
            prove,
            credentials,
            schema_ids,
            cred_def_ids,
        })
    }
}

/// Resolves a submission path of the shape `$.verifiableCredential[n]`
/// into an index of the candidate set.
fn resolve_credential_path(path: &str, candidate_count: usize) -> CredflowResult<usize> {
    let index = path
        .strip_prefix("$.verifiableCredential[")
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|index| index.parse::<usize>().ok())
        .ok_or_else(|| {
            CredflowError::from_msg(
                CredflowErrorKind::AmbiguousCredential,
                format!("Submission path {path} does not select a single credential"),
            )
        })?;
    if index >= candidate_count {
        return Err(CredflowError::from_msg(
            CredflowErrorKind::AmbiguousCredential,
            format!("Submission path {path} points outside the candidate set"),
        ));
    }
    Ok(index)
}

/// Whether the descriptor mandates a revocation-status proof. Directives
/// other than `allowed` and `required` are not supported.
fn requires_revocation_status(constraints: &Constraints) -> CredflowResult<bool> {
    let Some(active) = constraints.statuses.as_ref().and_then(|s| s.active.as_ref()) else {
        return Ok(false);
    };
    match active.directive {
        Directive::Allowed | Directive::Required => Ok(true),
        Directive::Disallowed => Err(CredflowError::from_msg(
            CredflowErrorKind::InvalidInput,
            "Unsupported status directive",
        )),
    }
}

/// The claim name addressed by a field, when it targets the credential
/// subject. Fields with other path shapes are skipped.
fn claim_name_for_field(field: &Field) -> Option<String> {
    const BASE_CLAIM_PATH: &str = "$.credentialSubject.";
    field
        .path
        .iter()
        .find_map(|path| path.strip_prefix(BASE_CLAIM_PATH))
        .map(str::to_owned)
}

fn predicate_bounds(filter: &Filter) -> Vec<(PredicateTypes, i32)> {
    let mut bounds = Vec::new();
    if let Some(value) = filter.exclusive_minimum {
        bounds.push((PredicateTypes::GT, value));
    }
    if let Some(value) = filter.exclusive_maximum {
        bounds.push((PredicateTypes::LT, value));
    }
    if let Some(value) = filter.minimum {
        bounds.push((PredicateTypes::GE, value));
    }
    if let Some(value) = filter.maximum {
        bounds.push((PredicateTypes::LE, value));
    }
    bounds
}

/// A deterministic nonce bound to the definition: the first 32 decimal
/// digits of the sha-256 digest of its id.
fn derive_nonce(definition_id: &str) -> CredflowResult<Nonce> {
    let digest = Sha256::digest(definition_id.as_bytes());
    let mut decimal = BigUint::from_bytes_be(&digest).to_string();
    decimal.truncate(32);
    Nonce::from_dec(decimal)
        .map_err(|err| CredflowError::from_msg(CredflowErrorKind::EncodingError, err))
}
