use std::{collections::HashMap, fmt::Debug};

use async_trait::async_trait;
use credflow_messages::decorators::attachment::Attachment;
use serde_json::Value;

use super::FormatAttachment;
use crate::errors::CredflowResult;

/// One credential format's behavior across the issue-credential protocol
/// steps. The `thread_id` ties per-thread artifacts (e.g. request
/// metadata) across steps.
#[async_trait]
pub trait CredentialFormatService: Debug + Send + Sync {
    fn supports(&self, format: &str) -> bool;

    /// Holder: propose issuance, constrained by a format-specific filter.
    async fn create_proposal(
        &self,
        thread_id: &str,
        filter: &Value,
    ) -> CredflowResult<FormatAttachment>;

    /// Issuer: turn a received proposal into an offer.
    async fn accept_proposal(
        &self,
        thread_id: &str,
        proposal: &Attachment,
    ) -> CredflowResult<FormatAttachment>;

    /// Issuer: offer issuance unprompted.
    async fn create_offer(&self, thread_id: &str, input: &Value)
        -> CredflowResult<FormatAttachment>;

    /// Holder: turn a received offer into a credential request.
    async fn accept_offer(
        &self,
        thread_id: &str,
        offer: &Attachment,
    ) -> CredflowResult<FormatAttachment>;

    /// Issuer: issue the credential answering a received request.
    async fn accept_request(
        &self,
        thread_id: &str,
        offer: &Attachment,
        request: &Attachment,
        values: &HashMap<String, String>,
    ) -> CredflowResult<FormatAttachment>;

    /// Holder: store a received credential, returning its referent.
    async fn process_credential(
        &self,
        thread_id: &str,
        credential: &Attachment,
    ) -> CredflowResult<String>;
}
