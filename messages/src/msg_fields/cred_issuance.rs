//! Messages of the issue-credential 2.0 protocol
//! ([RFC 0453](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0453-issue-credential-v2/README.md>)).

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{attachment::Attachment, please_ack::PleaseAck, thread::Thread},
    msg_fields::{
        common::{CredentialPreview, FormatSpec},
        ExchangeMessage, MessageClass,
    },
    msg_types::{MessageType, DIDCOMM_ORG_PREFIX},
};

pub const PROTOCOL_NAME: &str = "issue-credential";

fn cred_issuance_type(message_name: &str) -> MessageType {
    MessageType::new(DIDCOMM_ORG_PREFIX, PROTOCOL_NAME, 2, 0, message_name)
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProposeCredentialV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = ProposeCredentialV2::message_type())]
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_preview: Option<CredentialPreview>,
    pub formats: Vec<FormatSpec>,
    #[serde(rename = "filters~attach")]
    pub filters_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct OfferCredentialV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = OfferCredentialV2::message_type())]
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_id: Option<String>,
    pub credential_preview: CredentialPreview,
    pub formats: Vec<FormatSpec>,
    #[serde(rename = "offers~attach")]
    pub offers_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestCredentialV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = RequestCredentialV2::message_type())]
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    pub formats: Vec<FormatSpec>,
    #[serde(rename = "requests~attach")]
    pub requests_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct IssueCredentialV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = IssueCredentialV2::message_type())]
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[serde(rename = "~thread")]
    pub thread: Thread,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_id: Option<String>,
    pub formats: Vec<FormatSpec>,
    #[serde(rename = "credentials~attach")]
    pub credentials_attach: Vec<Attachment>,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "~please_ack", skip_serializing_if = "Option::is_none")]
    pub please_ack: Option<PleaseAck>,
}

impl ExchangeMessage for ProposeCredentialV2 {
    const CLASS: MessageClass = MessageClass::ProposeCredential;

    fn message_type() -> MessageType {
        cred_issuance_type("propose-credential")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }
}

impl ExchangeMessage for OfferCredentialV2 {
    const CLASS: MessageClass = MessageClass::OfferCredential;

    fn message_type() -> MessageType {
        cred_issuance_type("offer-credential")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }
}

impl ExchangeMessage for RequestCredentialV2 {
    const CLASS: MessageClass = MessageClass::RequestCredential;

    fn message_type() -> MessageType {
        cred_issuance_type("request-credential")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }
}

impl ExchangeMessage for IssueCredentialV2 {
    const CLASS: MessageClass = MessageClass::IssueCredential;

    fn message_type() -> MessageType {
        cred_issuance_type("issue-credential")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        Some(&self.thread)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::msg_fields::common::PreviewAttribute;

    #[test]
    fn test_offer_credential_shape() {
        let preview = CredentialPreview::new(vec![PreviewAttribute::builder()
            .name("age".to_owned())
            .value("21".to_owned())
            .build()]);
        let offer = OfferCredentialV2::builder()
            .id("offer-1".to_owned())
            .credential_preview(preview)
            .formats(vec![FormatSpec::new(
                "attach-1".to_owned(),
                "anoncreds/credential-offer@v1.0".to_owned(),
            )])
            .offers_attach(vec![Attachment::base64_json(
                "attach-1".to_owned(),
                &json!({ "cred_def_id": "cd:1" }),
            )])
            .build();

        let value = serde_json::to_value(&offer).unwrap();

        assert_eq!(value["@id"], "offer-1");
        assert_eq!(
            value["@type"],
            "https://didcomm.org/issue-credential/2.0/offer-credential"
        );
        assert_eq!(value["formats"][0]["attach_id"], "attach-1");
        assert_eq!(value["offers~attach"][0]["@id"], "attach-1");
        assert!(value.get("~thread").is_none());
    }

    #[test]
    fn test_issue_credential_round_trip() {
        let issue = IssueCredentialV2::builder()
            .id("issue-1".to_owned())
            .thread(Thread::new("thread-1".to_owned()))
            .formats(vec![FormatSpec::new(
                "attach-1".to_owned(),
                "anoncreds/credential@v1.0".to_owned(),
            )])
            .credentials_attach(vec![Attachment::base64_json(
                "attach-1".to_owned(),
                &json!({ "values": {} }),
            )])
            .please_ack(PleaseAck::default())
            .build();

        let value = serde_json::to_value(&issue).unwrap();
        let decoded: IssueCredentialV2 = serde_json::from_value(value).unwrap();

        assert_eq!(decoded, issue);
        assert_eq!(decoded.thread().unwrap().thid, "thread-1");
    }
}
