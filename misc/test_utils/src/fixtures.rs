//! Canned ledger objects for tests.

use std::collections::HashMap;

use anoncreds_types::{
    credential::CredentialInfo,
    identifiers::{CredentialDefinitionId, RevocationRegistryDefinitionId, SchemaId},
    ledger::{
        cred_def::CredentialDefinition, rev_reg_def::RevocationRegistryDefinition,
        rev_status_list::RevocationStatusList, schema::Schema,
    },
};
use serde_json::json;

pub const ISSUER_ID: &str = "mock:issuer";

pub fn schema(id: &str) -> Schema {
    serde_json::from_value(json!({
        "id": id,
        "name": "employment",
        "version": "1.0",
        "attrNames": ["name", "department", "age"],
        "issuerId": ISSUER_ID,
    }))
    .unwrap()
}

pub fn cred_def(id: &str, schema_id: &str) -> CredentialDefinition {
    serde_json::from_value(json!({
        "id": id,
        "schemaId": schema_id,
        "type": "CL",
        "tag": "default",
        "value": { "primary": {} },
        "issuerId": ISSUER_ID,
    }))
    .unwrap()
}

pub fn rev_reg_def(id: &str, cred_def_id: &str) -> RevocationRegistryDefinition {
    serde_json::from_value(json!({
        "id": id,
        "issuerId": ISSUER_ID,
        "revocDefType": "CL_ACCUM",
        "tag": "default",
        "credDefId": cred_def_id,
        "value": {
            "maxCredNum": 4,
            "publicKeys": { "accumKey": {} },
            "tailsHash": "hash",
            "tailsLocation": "https://tails.example/hash",
        },
    }))
    .unwrap()
}

/// A status list published at `timestamp` with the given revocation bits.
pub fn status_list(rev_reg_def_id: &str, timestamp: u64, bits: &[u8]) -> RevocationStatusList {
    serde_json::from_value(json!({
        "revRegDefId": rev_reg_def_id,
        "issuerId": ISSUER_ID,
        "revocationList": bits,
        "currentAccumulator": format!("accum-{timestamp}"),
        "timestamp": timestamp,
    }))
    .unwrap()
}

pub fn credential_info(
    referent: &str,
    schema_id: &str,
    cred_def_id: &str,
    rev_reg_id: Option<&str>,
) -> CredentialInfo {
    CredentialInfo {
        referent: referent.to_owned(),
        attrs: HashMap::from([
            ("name".to_owned(), "Alice".to_owned()),
            ("age".to_owned(), "42".to_owned()),
        ]),
        schema_id: SchemaId::from(schema_id),
        cred_def_id: CredentialDefinitionId::from(cred_def_id),
        rev_reg_id: rev_reg_id.map(RevocationRegistryDefinitionId::from),
        cred_rev_id: rev_reg_id.map(|_| "1".to_owned()),
    }
}
