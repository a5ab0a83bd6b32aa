//! The present-proof 2.0 coordinator.

use std::sync::Arc;

use anoncreds_types::{
    comparison::are_proof_requests_equal, pres_request::PresentationRequestPayload,
};
use chrono::Utc;
use credflow_messages::{
    decorators::{attachment::Attachment, please_ack::PleaseAck, thread::Thread, timing::Timing},
    misc::generate_message_id,
    msg_fields::{
        common::FormatSpec,
        present_proof::{
            AckStatus, PresentationAckV2, PresentationV2, ProposePresentationV2,
            RequestPresentationV2,
        },
        ExchangeMessage,
    },
};
use log::trace;

use super::{
    attachment_for_format, split_parts,
    states::{ensure_not_terminal, ProofState},
    verify_thread_id,
};
use crate::{
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
    formats::proof::ProofFormatService,
    storage::{ExchangeMessageStore, ExchangeMessageStoreExt, ExchangeRole},
};

pub struct ProofFormatCoordinator {
    store: Arc<dyn ExchangeMessageStore>,
    services: Vec<Arc<dyn ProofFormatService>>,
}

impl ProofFormatCoordinator {
    pub fn new(
        store: Arc<dyn ExchangeMessageStore>,
        services: Vec<Arc<dyn ProofFormatService>>,
    ) -> Self {
        Self { store, services }
    }

    /// All registered services matching one of the message's format
    /// descriptors, in registration order. Descriptors no service
    /// understands are skipped; a message no service understands is an
    /// error.
    fn services_for_formats(
        &self,
        formats: &[FormatSpec],
    ) -> CredflowResult<Vec<&Arc<dyn ProofFormatService>>> {
        let services: Vec<_> = self
            .services
            .iter()
            .filter(|service| formats.iter().any(|spec| service.supports(&spec.format)))
            .collect();
        if services.is_empty() {
            return Err(CredflowError::from_msg(
                CredflowErrorKind::NoMatchingFormatPlugin,
                "No registered proof format service understands the message formats",
            ));
        }
        Ok(services)
    }

    /// The exchange state as reconstructed from the stored messages.
    pub async fn state(&self, thread_id: &str) -> CredflowResult<Option<ProofState>> {
        use ExchangeRole::{Receiver, Sender};

        let acked = self
            .store
            .find(thread_id, Sender, PresentationAckV2::CLASS)
            .await?
            .is_some()
            || self
                .store
                .find(thread_id, Receiver, PresentationAckV2::CLASS)
                .await?
                .is_some();
        if acked {
            return Ok(Some(ProofState::Acknowledged));
        }

        let checks = [
            (Sender, PresentationV2::CLASS, ProofState::PresentationSent),
            (Receiver, PresentationV2::CLASS, ProofState::PresentationReceived),
            (Sender, RequestPresentationV2::CLASS, ProofState::RequestSent),
            (Receiver, RequestPresentationV2::CLASS, ProofState::RequestReceived),
            (Sender, ProposePresentationV2::CLASS, ProofState::ProposalSent),
            (Receiver, ProposePresentationV2::CLASS, ProofState::ProposalReceived),
        ];
        for (role, class, state) in checks {
            if self.store.find(thread_id, role, class).await?.is_some() {
                return Ok(Some(state));
            }
        }
        Ok(None)
    }

    async fn ensure_active(&self, thread_id: &str) -> CredflowResult<()> {
        if let Some(state) = self.state(thread_id).await? {
            ensure_not_terminal(state.is_terminal(), state)?;
        }
        Ok(())
    }

    /// Prover: open an exchange by proposing the request the verifier
    /// should send.
    pub async fn create_proposal(
        &self,
        proposal: &PresentationRequestPayload,
    ) -> CredflowResult<ProposePresentationV2> {
        let id = generate_message_id();
        trace!("create_proposal >>> thread: {id}");

        let mut parts = Vec::with_capacity(self.services.len());
        for service in &self.services {
            parts.push(service.create_proposal(proposal).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let message = ProposePresentationV2::builder()
            .id(id.clone())
            .formats(formats)
            .proposals_attach(attachments)
            .build();

        self.store
            .save_message(&id, ExchangeRole::Sender, &message)
            .await?;
        Ok(message)
    }

    /// Verifier: record a received proposal.
    pub async fn process_proposal(&self, proposal: ProposePresentationV2) -> CredflowResult<()> {
        let thread_id = proposal.exchange_thread_id().to_owned();
        self.ensure_active(&thread_id).await?;
        self.services_for_formats(&proposal.formats)?;
        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &proposal)
            .await
    }

    /// Verifier: turn the stored proposal into a request. The format
    /// service replaces the proposal's nonce with a fresh one.
    pub async fn accept_proposal(&self, thread_id: &str) -> CredflowResult<RequestPresentationV2> {
        trace!("accept_proposal >>> thread: {thread_id}");
        self.ensure_active(thread_id).await?;
        let proposal: ProposePresentationV2 = self
            .store
            .get_message(thread_id, ExchangeRole::Receiver)
            .await?;

        let mut parts = Vec::new();
        for service in self.services_for_formats(&proposal.formats)? {
            let attachment = attachment_for_format(
                |format| service.supports(format),
                &proposal.formats,
                &proposal.proposals_attach,
            )?;
            parts.push(service.accept_proposal(&attachment).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let request = RequestPresentationV2::builder()
            .id(generate_message_id())
            .thread(Thread::new(thread_id.to_owned()))
            .will_confirm(true)
            .formats(formats)
            .request_presentations_attach(attachments)
            .build();

        self.store
            .save_message(thread_id, ExchangeRole::Sender, &request)
            .await?;
        Ok(request)
    }

    /// Verifier: open an exchange by requesting a presentation unprompted.
    pub async fn create_request(
        &self,
        request: &PresentationRequestPayload,
    ) -> CredflowResult<RequestPresentationV2> {
        let id = generate_message_id();
        trace!("create_request >>> thread: {id}");

        let mut parts = Vec::with_capacity(self.services.len());
        for service in &self.services {
            parts.push(service.create_request(request).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let message = RequestPresentationV2::builder()
            .id(id.clone())
            .will_confirm(true)
            .formats(formats)
            .request_presentations_attach(attachments)
            .build();

        self.store
            .save_message(&id, ExchangeRole::Sender, &message)
            .await?;
        Ok(message)
    }

    /// Prover: validate and record a received request, returning the
    /// decoded payload for inspection.
    pub async fn process_request(
        &self,
        request: RequestPresentationV2,
    ) -> CredflowResult<PresentationRequestPayload> {
        let thread_id = request.exchange_thread_id().to_owned();
        self.ensure_active(&thread_id).await?;

        let services = self.services_for_formats(&request.formats)?;
        let mut payloads = Vec::with_capacity(services.len());
        for service in services {
            let attachment = attachment_for_format(
                |format| service.supports(format),
                &request.formats,
                &request.request_presentations_attach,
            )?;
            payloads.push(service.process_request(&attachment).await?);
        }

        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &request)
            .await?;
        payloads.into_iter().next().ok_or_else(|| {
            CredflowError::from_msg(
                CredflowErrorKind::NoMatchingFormatPlugin,
                "No format service decoded the request",
            )
        })
    }

    /// Prover: answer the stored request with a presentation.
    pub async fn accept_request(&self, thread_id: &str) -> CredflowResult<PresentationV2> {
        trace!("accept_request >>> thread: {thread_id}");
        self.ensure_active(thread_id).await?;
        let request: RequestPresentationV2 = self
            .store
            .get_message(thread_id, ExchangeRole::Receiver)
            .await?;

        let mut parts = Vec::new();
        for service in self.services_for_formats(&request.formats)? {
            let attachment = attachment_for_format(
                |format| service.supports(format),
                &request.formats,
                &request.request_presentations_attach,
            )?;
            parts.push(service.accept_request(&attachment).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let presentation = PresentationV2::builder()
            .id(generate_message_id())
            .thread(Thread::new(thread_id.to_owned()))
            .formats(formats)
            .presentations_attach(attachments)
            .please_ack(PleaseAck::default())
            .build();

        self.store
            .save_message(thread_id, ExchangeRole::Sender, &presentation)
            .await?;
        Ok(presentation)
    }

    /// Verifier: verify a received presentation against the request this
    /// side sent. Verified only when every matching format service
    /// verifies; the presentation is recorded either way.
    pub async fn process_presentation(
        &self,
        presentation: PresentationV2,
    ) -> CredflowResult<bool> {
        let thread_id = presentation.exchange_thread_id().to_owned();
        trace!("process_presentation >>> thread: {thread_id}");
        self.ensure_active(&thread_id).await?;
        let request: RequestPresentationV2 = self
            .store
            .get_message(&thread_id, ExchangeRole::Sender)
            .await?;
        verify_thread_id(&presentation, request.exchange_thread_id())?;

        let mut verified = true;
        for service in self.services_for_formats(&presentation.formats)? {
            let request_attachment = attachment_for_format(
                |format| service.supports(format),
                &request.formats,
                &request.request_presentations_attach,
            )?;
            let presentation_attachment = attachment_for_format(
                |format| service.supports(format),
                &presentation.formats,
                &presentation.presentations_attach,
            )?;
            verified &= service
                .verify_presentation(&request_attachment, &presentation_attachment)
                .await?;
        }

        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &presentation)
            .await?;
        Ok(verified)
    }

    /// Verifier: close the exchange with an acknowledgement carrying the
    /// verification verdict.
    pub async fn create_ack(
        &self,
        thread_id: &str,
        verified: bool,
    ) -> CredflowResult<PresentationAckV2> {
        self.ensure_active(thread_id).await?;
        let presentation: PresentationV2 = self
            .store
            .get_message(thread_id, ExchangeRole::Receiver)
            .await?;

        let ack = PresentationAckV2::builder()
            .id(generate_message_id())
            .thread(Thread::new(presentation.exchange_thread_id().to_owned()))
            .status(if verified { AckStatus::OK } else { AckStatus::FAIL })
            .timing(Timing::builder().out_time(Utc::now()).build())
            .build();

        self.store
            .save_message(thread_id, ExchangeRole::Sender, &ack)
            .await?;
        Ok(ack)
    }

    /// Prover: record the verifier's acknowledgement, closing the exchange.
    pub async fn process_ack(&self, ack: PresentationAckV2) -> CredflowResult<()> {
        let thread_id = ack.exchange_thread_id().to_owned();
        self.ensure_active(&thread_id).await?;
        let presentation: PresentationV2 = self
            .store
            .get_message(&thread_id, ExchangeRole::Sender)
            .await?;
        verify_thread_id(&ack, presentation.exchange_thread_id())?;
        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &ack)
            .await
    }

    /// Whether a received request asks for exactly what this side
    /// previously proposed, so the prover can respond without user
    /// interaction.
    pub async fn should_auto_respond_to_request(&self, thread_id: &str) -> CredflowResult<bool> {
        let Some(proposal) = self
            .store
            .find_message::<ProposePresentationV2>(thread_id, ExchangeRole::Sender)
            .await?
        else {
            return Ok(false);
        };
        let Some(request) = self
            .store
            .find_message::<RequestPresentationV2>(thread_id, ExchangeRole::Receiver)
            .await?
        else {
            return Ok(false);
        };
        self.requests_match(
            &proposal.formats,
            &proposal.proposals_attach,
            &request.formats,
            &request.request_presentations_attach,
        )
    }

    /// Whether a received counter-proposal matches the request this side
    /// already sent, so the verifier can re-send it without user
    /// interaction.
    pub async fn should_auto_respond_to_proposal(&self, thread_id: &str) -> CredflowResult<bool> {
        let Some(request) = self
            .store
            .find_message::<RequestPresentationV2>(thread_id, ExchangeRole::Sender)
            .await?
        else {
            return Ok(false);
        };
        let Some(proposal) = self
            .store
            .find_message::<ProposePresentationV2>(thread_id, ExchangeRole::Receiver)
            .await?
        else {
            return Ok(false);
        };
        self.requests_match(
            &request.formats,
            &request.request_presentations_attach,
            &proposal.formats,
            &proposal.proposals_attach,
        )
    }

    /// Semantic equality of two request payloads carried in attachments,
    /// ignoring cosmetic fields such as name, version and nonce.
    fn requests_match(
        &self,
        formats_a: &[FormatSpec],
        attachments_a: &[Attachment],
        formats_b: &[FormatSpec],
        attachments_b: &[Attachment],
    ) -> CredflowResult<bool> {
        for service in self.services_for_formats(formats_a)? {
            let a =
                attachment_for_format(|format| service.supports(format), formats_a, attachments_a)?;
            let b =
                attachment_for_format(|format| service.supports(format), formats_b, attachments_b)?;
            let a: PresentationRequestPayload = serde_json::from_value(a.as_json()?)?;
            let b: PresentationRequestPayload = serde_json::from_value(b.as_json()?)?;
            if !are_proof_requests_equal(&a, &b) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
