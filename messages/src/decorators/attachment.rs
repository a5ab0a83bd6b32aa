use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;
use url::Url;

use crate::misc::MimeType;

/// An appended attachment as defined in the attachments [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/concepts/0017-attachments/README.md>).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Attachment {
    #[builder(default, setter(strip_option))]
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "mime-type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod_time: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_count: Option<u64>,
    pub data: AttachmentData,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct AttachmentData {
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(flatten)]
    pub content: AttachmentType,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum AttachmentType {
    Base64(String),
    Json(Value),
    Links(Vec<Url>),
}

impl Attachment {
    /// Builds a base64 encoded JSON attachment under the given attachment id,
    /// the only attachment shape the exchange protocols emit.
    pub fn base64_json(id: String, json: &Value) -> Self {
        let content = AttachmentType::Base64(STANDARD.encode(json.to_string()));
        let data = AttachmentData::builder().content(content).build();
        let mut attachment = Attachment::builder().data(data).build();
        attachment.id = Some(id);
        attachment.mime_type = Some(MimeType::Json);
        attachment
    }

    /// Decodes the attachment content back into JSON, accepting both the
    /// base64 and the plain json data shapes from the wire.
    pub fn as_json(&self) -> Result<Value, AttachmentDecodeError> {
        match &self.data.content {
            AttachmentType::Json(value) => Ok(value.clone()),
            AttachmentType::Base64(encoded) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|err| AttachmentDecodeError(err.to_string()))?;
                serde_json::from_slice(&bytes).map_err(|err| AttachmentDecodeError(err.to_string()))
            }
            AttachmentType::Links(_) => Err(AttachmentDecodeError(
                "Cannot decode a links attachment as JSON".to_owned(),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Attachment is not base64 encoded JSON: {0}")]
pub struct AttachmentDecodeError(pub String);
