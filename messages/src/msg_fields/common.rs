use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::misc::MimeType;

/// Binds a format identifier (e.g. `anoncreds/proof-request@v1.0`) to the
/// attachment carrying the payload in that format. Every v2 exchange
/// message carries a list of these alongside its attachments.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct FormatSpec {
    pub attach_id: String,
    pub format: String,
}

impl FormatSpec {
    pub fn new(attach_id: String, format: String) -> Self {
        Self { attach_id, format }
    }
}

/// In-band preview of the credential attributes under negotiation, from the
/// issue-credential 2.0 [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0453-issue-credential-v2/README.md>).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CredentialPreview {
    #[serde(rename = "@type")]
    pub msg_type: CredentialPreviewMsgType,
    pub attributes: Vec<PreviewAttribute>,
}

impl CredentialPreview {
    pub fn new(attributes: Vec<PreviewAttribute>) -> Self {
        Self {
            msg_type: CredentialPreviewMsgType,
            attributes,
        }
    }
}

/// Unit marker serializing to the fixed preview type uri.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CredentialPreviewMsgType;

const CREDENTIAL_PREVIEW_TYPE: &str = "https://didcomm.org/issue-credential/2.0/credential-preview";

impl Serialize for CredentialPreviewMsgType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(CREDENTIAL_PREVIEW_TYPE)
    }
}

impl<'de> Deserialize<'de> for CredentialPreviewMsgType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let type_str = String::deserialize(deserializer)?;
        if type_str == CREDENTIAL_PREVIEW_TYPE {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(format!(
                "Unexpected credential preview type: {type_str}"
            )))
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct PreviewAttribute {
    pub name: String,
    pub value: String,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "mime-type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,
}
