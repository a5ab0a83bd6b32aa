use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{CredentialDefinitionId, IssuerId, SchemaId};

pub const CL_SIGNATURE_TYPE: &str = "CL";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum SignatureType {
    CL,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinition {
    pub id: CredentialDefinitionId,
    pub schema_id: SchemaId,
    #[serde(rename = "type")]
    pub signature_type: SignatureType,
    pub tag: String,
    // Opaque CL public key material, passed through to the crypto layer.
    pub value: Value,
    pub issuer_id: IssuerId,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cred_def_round_trip() {
        let cred_def_json = json!({
            "id": "mock:uri:creddef",
            "schemaId": "mock:uri:schema",
            "type": "CL",
            "tag": "default",
            "value": { "primary": {} },
            "issuerId": "mock:uri"
        });

        let cred_def: CredentialDefinition =
            serde_json::from_value(cred_def_json.clone()).unwrap();
        assert_eq!(cred_def.signature_type, SignatureType::CL);
        assert_eq!(serde_json::to_value(&cred_def).unwrap(), cred_def_json);
    }
}
