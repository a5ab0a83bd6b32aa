use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::identifiers::{CredentialDefinitionId, RevocationRegistryDefinitionId, SchemaId};

/// What a holder knows about one stored credential, as returned by
/// credential search.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct CredentialInfo {
    pub referent: String,
    #[builder(default)]
    pub attrs: HashMap<String, String>,
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryDefinitionId>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cred_rev_id: Option<String>,
}

/// The holder's selection of credentials answering a proof request, keyed
/// by the request's referents.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RequestedCredentials {
    #[serde(default)]
    pub requested_attributes: HashMap<String, RequestedAttribute>,
    #[serde(default)]
    pub requested_predicates: HashMap<String, RequestedPredicate>,
    #[serde(default)]
    pub self_attested_attributes: HashMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestedAttribute {
    pub cred_id: String,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub revealed: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestedPredicate {
    pub cred_id: String,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}
