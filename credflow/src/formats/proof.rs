use std::fmt::Debug;

use anoncreds_types::pres_request::PresentationRequestPayload;
use async_trait::async_trait;
use credflow_messages::decorators::attachment::Attachment;

use super::FormatAttachment;
use crate::errors::CredflowResult;

/// One proof format's behavior across the present-proof protocol steps.
#[async_trait]
pub trait ProofFormatService: Debug + Send + Sync {
    fn supports(&self, format: &str) -> bool;

    /// Prover: propose the request shape the verifier should send.
    async fn create_proposal(
        &self,
        proposal: &PresentationRequestPayload,
    ) -> CredflowResult<FormatAttachment>;

    /// Verifier: turn a received proposal into a request. The proposal's
    /// nonce was chosen by the prover and must not be trusted, a fresh one
    /// is generated.
    async fn accept_proposal(&self, proposal: &Attachment) -> CredflowResult<FormatAttachment>;

    /// Verifier: request a presentation unprompted.
    async fn create_request(
        &self,
        request: &PresentationRequestPayload,
    ) -> CredflowResult<FormatAttachment>;

    /// Prover: validate a received request and decode it.
    async fn process_request(
        &self,
        request: &Attachment,
    ) -> CredflowResult<PresentationRequestPayload>;

    /// Prover: answer a received request with a presentation, selecting
    /// credentials and resolving revocation state.
    async fn accept_request(&self, request: &Attachment) -> CredflowResult<FormatAttachment>;

    /// Verifier: verify a received presentation against the request that
    /// was sent. Unverifiable revocation windows and bad attribute
    /// encodings yield `false` rather than an error.
    async fn verify_presentation(
        &self,
        request: &Attachment,
        presentation: &Attachment,
    ) -> CredflowResult<bool>;
}
