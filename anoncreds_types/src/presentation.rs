use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{CredentialDefinitionId, RevocationRegistryDefinitionId, SchemaId};

/// An anoncreds presentation as produced by the prover. The cryptographic
/// proof itself is opaque to this crate; the revealed values and the
/// identifiers of the credentials used are not.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Presentation {
    pub proof: Value,
    pub requested_proof: RequestedProof,
    pub identifiers: Vec<Identifier>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RequestedProof {
    #[serde(default)]
    pub revealed_attrs: HashMap<String, RevealedAttributeInfo>,
    #[serde(default)]
    pub revealed_attr_groups: HashMap<String, RevealedAttributeGroupInfo>,
    #[serde(default)]
    pub self_attested_attrs: HashMap<String, String>,
    #[serde(default)]
    pub unrevealed_attrs: HashMap<String, SubProofReferent>,
    #[serde(default)]
    pub predicates: HashMap<String, SubProofReferent>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RevealedAttributeInfo {
    pub sub_proof_index: u32,
    pub raw: String,
    pub encoded: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RevealedAttributeGroupInfo {
    pub sub_proof_index: u32,
    pub values: HashMap<String, AttributeValue>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AttributeValue {
    pub raw: String,
    pub encoded: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SubProofReferent {
    pub sub_proof_index: u32,
}

/// Identifies the ledger objects one sub-proof was built against.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Identifier {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryDefinitionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}
