//! The issue-credential 2.0 coordinator. It assembles protocol messages
//! from format service contributions, routes inbound attachments to the
//! service that understands their format, and persists every message it
//! sends or receives under the exchange thread.

use std::{collections::HashMap, sync::Arc};

use credflow_messages::{
    decorators::{attachment::Attachment, please_ack::PleaseAck, thread::Thread},
    misc::generate_message_id,
    msg_fields::{
        common::{CredentialPreview, FormatSpec},
        cred_issuance::{
            IssueCredentialV2, OfferCredentialV2, ProposeCredentialV2, RequestCredentialV2,
        },
        ExchangeMessage,
    },
};
use log::trace;
use serde_json::Value;

use super::{
    attachment_for_format, split_parts,
    states::{ensure_not_terminal, CredentialState},
    verify_thread_id,
};
use crate::{
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
    formats::credential::CredentialFormatService,
    storage::{ExchangeMessageStore, ExchangeMessageStoreExt, ExchangeRole},
};

pub struct CredentialFormatCoordinator {
    store: Arc<dyn ExchangeMessageStore>,
    services: Vec<Arc<dyn CredentialFormatService>>,
}

impl CredentialFormatCoordinator {
    pub fn new(
        store: Arc<dyn ExchangeMessageStore>,
        services: Vec<Arc<dyn CredentialFormatService>>,
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
    ) -> CredflowResult<Vec<&Arc<dyn CredentialFormatService>>> {
        let services: Vec<_> = self
            .services
            .iter()
            .filter(|service| formats.iter().any(|spec| service.supports(&spec.format)))
            .collect();
        if services.is_empty() {
            return Err(CredflowError::from_msg(
                CredflowErrorKind::NoMatchingFormatPlugin,
                "No registered credential format service understands the message formats",
            ));
        }
        Ok(services)
    }

    /// The exchange state as reconstructed from the stored messages.
    pub async fn state(&self, thread_id: &str) -> CredflowResult<Option<CredentialState>> {
        use ExchangeRole::{Receiver, Sender};

        let checks = [
            (Sender, IssueCredentialV2::CLASS, CredentialState::CredentialIssued),
            (Receiver, IssueCredentialV2::CLASS, CredentialState::CredentialReceived),
            (Sender, RequestCredentialV2::CLASS, CredentialState::RequestSent),
            (Receiver, RequestCredentialV2::CLASS, CredentialState::RequestReceived),
            (Sender, OfferCredentialV2::CLASS, CredentialState::OfferSent),
            (Receiver, OfferCredentialV2::CLASS, CredentialState::OfferReceived),
            (Sender, ProposeCredentialV2::CLASS, CredentialState::ProposalSent),
            (Receiver, ProposeCredentialV2::CLASS, CredentialState::ProposalReceived),
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

    /// Holder: open an exchange by proposing issuance. Every registered
    /// service contributes a filter attachment.
    pub async fn create_proposal(
        &self,
        filter: &Value,
        preview: Option<CredentialPreview>,
    ) -> CredflowResult<ProposeCredentialV2> {
        let id = generate_message_id();
        trace!("create_proposal >>> thread: {id}");

        let mut parts = Vec::with_capacity(self.services.len());
        for service in &self.services {
            parts.push(service.create_proposal(&id, filter).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let builder = ProposeCredentialV2::builder()
            .id(id.clone())
            .formats(formats)
            .filters_attach(attachments);
        let proposal = if let Some(preview) = preview {
            builder.credential_preview(preview).build()
        } else {
            builder.build()
        };

        self.store
            .save_message(&id, ExchangeRole::Sender, &proposal)
            .await?;
        Ok(proposal)
    }

    /// Issuer: record a received proposal.
    pub async fn process_proposal(&self, proposal: ProposeCredentialV2) -> CredflowResult<()> {
        let thread_id = proposal.exchange_thread_id().to_owned();
        self.ensure_active(&thread_id).await?;
        self.services_for_formats(&proposal.formats)?;
        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &proposal)
            .await
    }

    /// Issuer: answer the stored proposal with an offer. When the proposal
    /// carries no preview, a blank one is sent.
    pub async fn accept_proposal(&self, thread_id: &str) -> CredflowResult<OfferCredentialV2> {
        trace!("accept_proposal >>> thread: {thread_id}");
        self.ensure_active(thread_id).await?;
        let proposal: ProposeCredentialV2 = self
            .store
            .get_message(thread_id, ExchangeRole::Receiver)
            .await?;

        let mut parts = Vec::new();
        for service in self.services_for_formats(&proposal.formats)? {
            let attachment = attachment_for_format(
                |format| service.supports(format),
                &proposal.formats,
                &proposal.filters_attach,
            )?;
            parts.push(service.accept_proposal(thread_id, &attachment).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let preview = proposal
            .credential_preview
            .unwrap_or_else(|| CredentialPreview::new(Vec::new()));
        let offer = OfferCredentialV2::builder()
            .id(generate_message_id())
            .thread(Thread::new(thread_id.to_owned()))
            .credential_preview(preview)
            .formats(formats)
            .offers_attach(attachments)
            .build();

        self.store
            .save_message(thread_id, ExchangeRole::Sender, &offer)
            .await?;
        Ok(offer)
    }

    /// Issuer: open an exchange by offering a credential unprompted.
    pub async fn create_offer(
        &self,
        input: &Value,
        preview: CredentialPreview,
    ) -> CredflowResult<OfferCredentialV2> {
        let id = generate_message_id();
        trace!("create_offer >>> thread: {id}");

        let mut parts = Vec::with_capacity(self.services.len());
        for service in &self.services {
            parts.push(service.create_offer(&id, input).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let offer = OfferCredentialV2::builder()
            .id(id.clone())
            .credential_preview(preview)
            .formats(formats)
            .offers_attach(attachments)
            .build();

        self.store
            .save_message(&id, ExchangeRole::Sender, &offer)
            .await?;
        Ok(offer)
    }

    /// Holder: record a received offer.
    pub async fn process_offer(&self, offer: OfferCredentialV2) -> CredflowResult<()> {
        let thread_id = offer.exchange_thread_id().to_owned();
        self.ensure_active(&thread_id).await?;
        self.services_for_formats(&offer.formats)?;
        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &offer)
            .await
    }

    /// Holder: answer the stored offer with a credential request.
    pub async fn accept_offer(&self, thread_id: &str) -> CredflowResult<RequestCredentialV2> {
        trace!("accept_offer >>> thread: {thread_id}");
        self.ensure_active(thread_id).await?;
        let offer: OfferCredentialV2 = self
            .store
            .get_message(thread_id, ExchangeRole::Receiver)
            .await?;

        let mut parts = Vec::new();
        for service in self.services_for_formats(&offer.formats)? {
            let attachment = attachment_for_format(
                |format| service.supports(format),
                &offer.formats,
                &offer.offers_attach,
            )?;
            parts.push(service.accept_offer(thread_id, &attachment).await?);
        }
        let (formats, attachments) = split_parts(parts);

        let request = RequestCredentialV2::builder()
            .id(generate_message_id())
            .thread(Thread::new(thread_id.to_owned()))
            .formats(formats)
            .requests_attach(attachments)
            .build();

        self.store
            .save_message(thread_id, ExchangeRole::Sender, &request)
            .await?;
        Ok(request)
    }

    /// Holder: open an exchange at the request step from an offer payload
    /// obtained out of band.
    pub async fn create_request(
        &self,
        format: &str,
        offer_payload: &Value,
    ) -> CredflowResult<RequestCredentialV2> {
        let id = generate_message_id();
        trace!("create_request >>> thread: {id}");

        let service = self
            .services
            .iter()
            .find(|service| service.supports(format))
            .ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::NoMatchingFormatPlugin,
                    format!("No registered credential format service supports {format}"),
                )
            })?;
        let offer = Attachment::base64_json(generate_message_id(), offer_payload);
        let part = service.accept_offer(&id, &offer).await?;
        let (formats, attachments) = split_parts(vec![part]);

        let request = RequestCredentialV2::builder()
            .id(id.clone())
            .formats(formats)
            .requests_attach(attachments)
            .build();

        self.store
            .save_message(&id, ExchangeRole::Sender, &request)
            .await?;
        Ok(request)
    }

    /// Issuer: record a received request, checking it answers a thread this
    /// side actually offered on when it is threaded.
    pub async fn process_request(&self, request: RequestCredentialV2) -> CredflowResult<()> {
        let thread_id = request.exchange_thread_id().to_owned();
        self.ensure_active(&thread_id).await?;
        if request.thread().is_some() {
            let offer: OfferCredentialV2 = self
                .store
                .get_message(&thread_id, ExchangeRole::Sender)
                .await?;
            verify_thread_id(&request, offer.exchange_thread_id())?;
        }
        self.services_for_formats(&request.formats)?;
        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &request)
            .await
    }

    /// Issuer: issue the credential answering the stored request, using the
    /// supplied attribute values. The message asks for an acknowledgement.
    pub async fn accept_request(
        &self,
        thread_id: &str,
        values: &HashMap<String, String>,
    ) -> CredflowResult<IssueCredentialV2> {
        trace!("accept_request >>> thread: {thread_id}");
        self.ensure_active(thread_id).await?;
        let offer: OfferCredentialV2 = self
            .store
            .get_message(thread_id, ExchangeRole::Sender)
            .await?;
        let request: RequestCredentialV2 = self
            .store
            .get_message(thread_id, ExchangeRole::Receiver)
            .await?;

        let mut parts = Vec::new();
        for service in self.services_for_formats(&request.formats)? {
            let offer_attachment = attachment_for_format(
                |format| service.supports(format),
                &offer.formats,
                &offer.offers_attach,
            )?;
            let request_attachment = attachment_for_format(
                |format| service.supports(format),
                &request.formats,
                &request.requests_attach,
            )?;
            parts.push(
                service
                    .accept_request(thread_id, &offer_attachment, &request_attachment, values)
                    .await?,
            );
        }
        let (formats, attachments) = split_parts(parts);

        let issue = IssueCredentialV2::builder()
            .id(generate_message_id())
            .thread(Thread::new(thread_id.to_owned()))
            .formats(formats)
            .credentials_attach(attachments)
            .please_ack(PleaseAck::default())
            .build();

        self.store
            .save_message(thread_id, ExchangeRole::Sender, &issue)
            .await?;
        Ok(issue)
    }

    /// Holder: store the received credential with every matching format
    /// service and return the first stored referent.
    pub async fn process_credential(&self, issue: IssueCredentialV2) -> CredflowResult<String> {
        let thread_id = issue.exchange_thread_id().to_owned();
        trace!("process_credential >>> thread: {thread_id}");
        self.ensure_active(&thread_id).await?;
        let request: RequestCredentialV2 = self
            .store
            .get_message(&thread_id, ExchangeRole::Sender)
            .await?;
        verify_thread_id(&issue, request.exchange_thread_id())?;

        let services = self.services_for_formats(&issue.formats)?;
        let mut referents = Vec::with_capacity(services.len());
        for service in services {
            let attachment = attachment_for_format(
                |format| service.supports(format),
                &issue.formats,
                &issue.credentials_attach,
            )?;
            referents.push(service.process_credential(&thread_id, &attachment).await?);
        }

        self.store
            .save_message(&thread_id, ExchangeRole::Receiver, &issue)
            .await?;
        referents.into_iter().next().ok_or_else(|| {
            CredflowError::from_msg(
                CredflowErrorKind::NoMatchingFormatPlugin,
                "No format service processed the credential",
            )
        })
    }
}
