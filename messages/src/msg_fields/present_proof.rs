//! Messages of the present-proof 2.0 protocol
//! ([RFC 0454](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0454-present-proof-v2/README.md>)).

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{attachment::Attachment, please_ack::PleaseAck, thread::Thread, timing::Timing},
    msg_fields::{common::FormatSpec, ExchangeMessage, MessageClass},
    msg_types::{MessageType, DIDCOMM_ORG_PREFIX},
};

pub const PROTOCOL_NAME: &str = "present-proof";

fn present_proof_type(message_name: &str) -> MessageType {
    MessageType::new(DIDCOMM_ORG_PREFIX, PROTOCOL_NAME, 2, 0, message_name)
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProposePresentationV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = ProposePresentationV2::message_type())]
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
    #[serde(rename = "proposals~attach")]
    pub proposals_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestPresentationV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = RequestPresentationV2::message_type())]
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
    pub will_confirm: Option<bool>,
    pub formats: Vec<FormatSpec>,
    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct PresentationV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = PresentationV2::message_type())]
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
    pub formats: Vec<FormatSpec>,
    #[serde(rename = "presentations~attach")]
    pub presentations_attach: Vec<Attachment>,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "~please_ack", skip_serializing_if = "Option::is_none")]
    pub please_ack: Option<PleaseAck>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct PresentationAckV2 {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = PresentationAckV2::message_type())]
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[serde(rename = "~thread")]
    pub thread: Thread,
    pub status: AckStatus,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "~timing", skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum AckStatus {
    OK,
    PENDING,
    FAIL,
}

impl ExchangeMessage for ProposePresentationV2 {
    const CLASS: MessageClass = MessageClass::ProposePresentation;

    fn message_type() -> MessageType {
        present_proof_type("propose-presentation")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }
}

impl ExchangeMessage for RequestPresentationV2 {
    const CLASS: MessageClass = MessageClass::RequestPresentation;

    fn message_type() -> MessageType {
        present_proof_type("request-presentation")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }
}

impl ExchangeMessage for PresentationV2 {
    const CLASS: MessageClass = MessageClass::Presentation;

    fn message_type() -> MessageType {
        present_proof_type("presentation")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        Some(&self.thread)
    }
}

impl ExchangeMessage for PresentationAckV2 {
    const CLASS: MessageClass = MessageClass::PresentationAck;

    fn message_type() -> MessageType {
        present_proof_type("ack")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn thread(&self) -> Option<&Thread> {
        Some(&self.thread)
    }
}
