//! Format services: the pluggable payload layer of the exchange
//! protocols. The coordinators route by format identifier; the services
//! own the payload semantics.

pub mod anoncreds;
pub mod credential;
pub mod proof;

use credflow_messages::{
    decorators::attachment::Attachment,
    misc::generate_message_id,
    msg_fields::common::FormatSpec,
};
use serde_json::Value;

/// One format's contribution to a protocol message: the descriptor and the
/// attachment it points at. Attachment ids are generated here, so each
/// pair is unique within a message by construction.
#[derive(Clone, Debug, PartialEq)]
pub struct FormatAttachment {
    pub spec: FormatSpec,
    pub attachment: Attachment,
}

impl FormatAttachment {
    pub fn base64_json(format: &str, payload: &Value) -> Self {
        let attach_id = generate_message_id();
        Self {
            spec: FormatSpec::new(attach_id.clone(), format.to_owned()),
            attachment: Attachment::base64_json(attach_id, payload),
        }
    }
}
