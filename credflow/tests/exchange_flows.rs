//! End-to-end exchanges between two coordinators sharing mocked
//! collaborators.

use std::{collections::HashMap, sync::Arc};

use anoncreds_types::{
    nonce::Nonce,
    pres_request::{AttributeInfo, PresentationRequestPayload},
};
use async_trait::async_trait;
use credflow::{
    errors::{CredflowErrorKind, CredflowResult},
    formats::{
        anoncreds::{
            credential::AnonCredsCredentialFormatService, proof::AnonCredsProofFormatService,
        },
        credential::CredentialFormatService,
        proof::ProofFormatService,
        FormatAttachment,
    },
    messages::{decorators::attachment::Attachment, msg_fields::ExchangeMessage},
    protocols::{
        issuance::CredentialFormatCoordinator, presentation::ProofFormatCoordinator,
        states::{CredentialState, ProofState},
    },
};
use serde_json::{json, Value};
use test_utils::{
    fixtures,
    mock_anoncreds::{MockHolder, MockIssuer, MockVerifier},
    mock_store::InMemoryMessageStore,
    mock_vdr::{MockTailsFileService, MockVdr},
};

fn issuance_coordinators() -> (CredentialFormatCoordinator, CredentialFormatCoordinator) {
    let vdr = Arc::new(
        MockVdr::new()
            .with_schema(fixtures::schema("schema:1"))
            .with_cred_def(fixtures::cred_def("cd:1", "schema:1")),
    );
    let service = Arc::new(AnonCredsCredentialFormatService::new(
        vdr,
        Arc::new(MockIssuer),
        Arc::new(MockHolder::default()),
    ));

    let holder = CredentialFormatCoordinator::new(
        Arc::new(InMemoryMessageStore::new()),
        vec![service.clone()],
    );
    let issuer =
        CredentialFormatCoordinator::new(Arc::new(InMemoryMessageStore::new()), vec![service]);
    (holder, issuer)
}

fn proof_request() -> PresentationRequestPayload {
    PresentationRequestPayload::builder()
        .nonce(Nonce::from_dec("123456789012").unwrap())
        .name("employment check".to_owned())
        .version("1.0".to_owned())
        .requested_attributes(HashMap::from([(
            "attr1_referent".to_owned(),
            AttributeInfo::builder().name("name".to_owned()).build(),
        )]))
        .build()
}

fn proof_coordinators(
    verifier: Arc<MockVerifier>,
) -> (ProofFormatCoordinator, ProofFormatCoordinator) {
    let vdr = Arc::new(
        MockVdr::new()
            .with_schema(fixtures::schema("schema:1"))
            .with_cred_def(fixtures::cred_def("cd:1", "schema:1")),
    );
    let holder = Arc::new(MockHolder::with_credentials(vec![
        fixtures::credential_info("cred-1", "schema:1", "cd:1", None),
    ]));
    let service = Arc::new(AnonCredsProofFormatService::new(
        vdr,
        Arc::new(MockTailsFileService),
        holder,
        verifier,
    ));

    let prover = ProofFormatCoordinator::new(
        Arc::new(InMemoryMessageStore::new()),
        vec![service.clone()],
    );
    let verifier_side =
        ProofFormatCoordinator::new(Arc::new(InMemoryMessageStore::new()), vec![service]);
    (prover, verifier_side)
}

#[tokio::test]
async fn issuance_flow_from_proposal_to_credential() {
    let (holder, issuer) = issuance_coordinators();

    let proposal = holder
        .create_proposal(&json!({ "cred_def_id": "cd:1" }), None)
        .await
        .unwrap();
    let thread_id = proposal.exchange_thread_id().to_owned();
    assert_eq!(
        holder.state(&thread_id).await.unwrap(),
        Some(CredentialState::ProposalSent)
    );

    issuer.process_proposal(proposal).await.unwrap();
    let offer = issuer.accept_proposal(&thread_id).await.unwrap();
    // No preview was proposed, so a blank one is offered.
    assert!(offer.credential_preview.attributes.is_empty());
    assert_eq!(offer.exchange_thread_id(), thread_id);

    holder.process_offer(offer).await.unwrap();
    let request = holder.accept_offer(&thread_id).await.unwrap();

    issuer.process_request(request).await.unwrap();
    let values = HashMap::from([("name".to_owned(), "Alice".to_owned())]);
    let issue = issuer.accept_request(&thread_id, &values).await.unwrap();
    assert!(issue.please_ack.is_some());
    assert_eq!(
        issuer.state(&thread_id).await.unwrap(),
        Some(CredentialState::CredentialIssued)
    );

    let referent = holder.process_credential(issue).await.unwrap();
    assert_eq!(referent, "stored-cred-0");
    assert_eq!(
        holder.state(&thread_id).await.unwrap(),
        Some(CredentialState::CredentialReceived)
    );
}

#[tokio::test]
async fn credential_for_unknown_thread_is_rejected() {
    let (holder, issuer) = issuance_coordinators();

    let offer = issuer
        .create_offer(
            &json!({ "cred_def_id": "cd:1" }),
            credflow::messages::msg_fields::common::CredentialPreview::new(Vec::new()),
        )
        .await
        .unwrap();
    let thread_id = offer.exchange_thread_id().to_owned();
    holder.process_offer(offer).await.unwrap();
    let request = holder.accept_offer(&thread_id).await.unwrap();
    issuer.process_request(request).await.unwrap();
    let issue = issuer
        .accept_request(&thread_id, &HashMap::new())
        .await
        .unwrap();

    // A different holder never sent the request this credential answers.
    let (other_holder, _) = issuance_coordinators();
    let err = other_holder.process_credential(issue).await.unwrap_err();
    assert_eq!(err.kind(), CredflowErrorKind::PriorMessageNotFound);
}

#[tokio::test]
async fn presentation_flow_from_request_to_ack() {
    let verifier = Arc::new(MockVerifier::default());
    let (prover, verifier_side) = proof_coordinators(verifier);

    let request = verifier_side.create_request(&proof_request()).await.unwrap();
    let thread_id = request.exchange_thread_id().to_owned();

    let payload = prover.process_request(request).await.unwrap();
    assert_eq!(payload.requested_attributes.len(), 1);

    let presentation = prover.accept_request(&thread_id).await.unwrap();
    assert!(presentation.please_ack.is_some());
    assert_eq!(
        prover.state(&thread_id).await.unwrap(),
        Some(ProofState::PresentationSent)
    );

    let verified = verifier_side
        .process_presentation(presentation)
        .await
        .unwrap();
    assert!(verified);

    let ack = verifier_side.create_ack(&thread_id, verified).await.unwrap();
    prover.process_ack(ack).await.unwrap();
    assert_eq!(
        prover.state(&thread_id).await.unwrap(),
        Some(ProofState::Acknowledged)
    );

    // A closed exchange accepts no further steps.
    let err = prover.accept_request(&thread_id).await.unwrap_err();
    assert_eq!(err.kind(), CredflowErrorKind::InvalidState);
}

#[tokio::test]
async fn proposal_nonce_is_regenerated_and_request_auto_accepted() {
    let verifier = Arc::new(MockVerifier::default());
    let (prover, verifier_side) = proof_coordinators(verifier);

    let payload = proof_request();
    let proposal = prover.create_proposal(&payload).await.unwrap();
    let thread_id = proposal.exchange_thread_id().to_owned();

    verifier_side.process_proposal(proposal).await.unwrap();
    let request = verifier_side.accept_proposal(&thread_id).await.unwrap();

    let request_payload = prover.process_request(request).await.unwrap();
    // The proposal's nonce must never be reused.
    assert_ne!(request_payload.nonce, payload.nonce);

    // Apart from the nonce the request asks exactly what was proposed.
    assert!(prover
        .should_auto_respond_to_request(&thread_id)
        .await
        .unwrap());
}

#[tokio::test]
async fn presentation_against_foreign_thread_is_rejected() {
    let verifier = Arc::new(MockVerifier::default());
    let (prover, verifier_side) = proof_coordinators(verifier);

    let request = verifier_side.create_request(&proof_request()).await.unwrap();
    let thread_id = request.exchange_thread_id().to_owned();
    prover.process_request(request).await.unwrap();
    let mut presentation = prover.accept_request(&thread_id).await.unwrap();

    // Rethread the presentation to a thread the verifier never opened.
    presentation.thread.thid = "unrelated-thread".to_owned();
    let err = verifier_side
        .process_presentation(presentation)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CredflowErrorKind::PriorMessageNotFound);
}

const ECHO_PROOF_REQUEST_FORMAT: &str = "echo/proof-request@v1.0";
const ECHO_PROOF_FORMAT: &str = "echo/proof@v1.0";

/// A second, trivial proof format: requests pass through verbatim and the
/// presentation is a fixed marker payload.
#[derive(Debug)]
struct EchoProofFormatService;

#[async_trait]
impl ProofFormatService for EchoProofFormatService {
    fn supports(&self, format: &str) -> bool {
        [ECHO_PROOF_REQUEST_FORMAT, ECHO_PROOF_FORMAT].contains(&format)
    }

    async fn create_proposal(
        &self,
        proposal: &PresentationRequestPayload,
    ) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(
            ECHO_PROOF_REQUEST_FORMAT,
            &serde_json::to_value(proposal)?,
        ))
    }

    async fn accept_proposal(&self, proposal: &Attachment) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(
            ECHO_PROOF_REQUEST_FORMAT,
            &proposal.as_json()?,
        ))
    }

    async fn create_request(
        &self,
        request: &PresentationRequestPayload,
    ) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(
            ECHO_PROOF_REQUEST_FORMAT,
            &serde_json::to_value(request)?,
        ))
    }

    async fn process_request(
        &self,
        request: &Attachment,
    ) -> CredflowResult<PresentationRequestPayload> {
        Ok(serde_json::from_value(request.as_json()?)?)
    }

    async fn accept_request(&self, _request: &Attachment) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(
            ECHO_PROOF_FORMAT,
            &json!({ "echoed": true }),
        ))
    }

    async fn verify_presentation(
        &self,
        _request: &Attachment,
        presentation: &Attachment,
    ) -> CredflowResult<bool> {
        Ok(presentation.as_json()?["echoed"] == json!(true))
    }
}

const ECHO_CRED_FILTER_FORMAT: &str = "echo/cred-filter@v1.0";
const ECHO_CRED_OFFER_FORMAT: &str = "echo/cred-offer@v1.0";
const ECHO_CRED_REQUEST_FORMAT: &str = "echo/cred-request@v1.0";
const ECHO_CRED_FORMAT: &str = "echo/credential@v1.0";

/// A second, trivial credential format passing payloads through verbatim.
#[derive(Debug)]
struct EchoCredentialFormatService;

#[async_trait]
impl CredentialFormatService for EchoCredentialFormatService {
    fn supports(&self, format: &str) -> bool {
        format.starts_with("echo/")
    }

    async fn create_proposal(
        &self,
        _thread_id: &str,
        filter: &Value,
    ) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(ECHO_CRED_FILTER_FORMAT, filter))
    }

    async fn accept_proposal(
        &self,
        _thread_id: &str,
        proposal: &Attachment,
    ) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(
            ECHO_CRED_OFFER_FORMAT,
            &proposal.as_json()?,
        ))
    }

    async fn create_offer(
        &self,
        _thread_id: &str,
        input: &Value,
    ) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(ECHO_CRED_OFFER_FORMAT, input))
    }

    async fn accept_offer(
        &self,
        _thread_id: &str,
        offer: &Attachment,
    ) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(
            ECHO_CRED_REQUEST_FORMAT,
            &offer.as_json()?,
        ))
    }

    async fn accept_request(
        &self,
        _thread_id: &str,
        _offer: &Attachment,
        _request: &Attachment,
        values: &HashMap<String, String>,
    ) -> CredflowResult<FormatAttachment> {
        Ok(FormatAttachment::base64_json(
            ECHO_CRED_FORMAT,
            &serde_json::to_value(values)?,
        ))
    }

    async fn process_credential(
        &self,
        _thread_id: &str,
        _credential: &Attachment,
    ) -> CredflowResult<String> {
        Ok("echo-credential".to_owned())
    }
}

fn two_format_issuance_coordinators() -> (CredentialFormatCoordinator, CredentialFormatCoordinator)
{
    let vdr = Arc::new(
        MockVdr::new()
            .with_schema(fixtures::schema("schema:1"))
            .with_cred_def(fixtures::cred_def("cd:1", "schema:1")),
    );
    let anoncreds = Arc::new(AnonCredsCredentialFormatService::new(
        vdr,
        Arc::new(MockIssuer),
        Arc::new(MockHolder::default()),
    ));
    let echo = Arc::new(EchoCredentialFormatService);

    let holder = CredentialFormatCoordinator::new(
        Arc::new(InMemoryMessageStore::new()),
        vec![anoncreds.clone(), echo.clone()],
    );
    let issuer = CredentialFormatCoordinator::new(
        Arc::new(InMemoryMessageStore::new()),
        vec![anoncreds, echo],
    );
    (holder, issuer)
}

fn two_format_proof_coordinators(
    verifier: Arc<MockVerifier>,
) -> (ProofFormatCoordinator, ProofFormatCoordinator) {
    let vdr = Arc::new(
        MockVdr::new()
            .with_schema(fixtures::schema("schema:1"))
            .with_cred_def(fixtures::cred_def("cd:1", "schema:1")),
    );
    let holder = Arc::new(MockHolder::with_credentials(vec![
        fixtures::credential_info("cred-1", "schema:1", "cd:1", None),
    ]));
    let anoncreds = Arc::new(AnonCredsProofFormatService::new(
        vdr,
        Arc::new(MockTailsFileService),
        holder,
        verifier,
    ));
    let echo = Arc::new(EchoProofFormatService);

    let prover = ProofFormatCoordinator::new(
        Arc::new(InMemoryMessageStore::new()),
        vec![anoncreds.clone(), echo.clone()],
    );
    let verifier_side = ProofFormatCoordinator::new(
        Arc::new(InMemoryMessageStore::new()),
        vec![anoncreds, echo],
    );
    (prover, verifier_side)
}

#[tokio::test]
async fn every_matching_proof_format_contributes_to_each_step() {
    let verifier = Arc::new(MockVerifier::default());
    let (prover, verifier_side) = two_format_proof_coordinators(verifier);

    let proposal = prover.create_proposal(&proof_request()).await.unwrap();
    let thread_id = proposal.exchange_thread_id().to_owned();
    assert_eq!(proposal.formats.len(), 2);

    verifier_side.process_proposal(proposal).await.unwrap();
    let request = verifier_side.accept_proposal(&thread_id).await.unwrap();
    // Both services answered the proposal, not just the first match.
    assert_eq!(request.formats.len(), 2);
    assert!(request
        .formats
        .iter()
        .any(|spec| spec.format == ECHO_PROOF_REQUEST_FORMAT));

    prover.process_request(request).await.unwrap();
    let presentation = prover.accept_request(&thread_id).await.unwrap();
    assert_eq!(presentation.formats.len(), 2);
    assert!(presentation
        .formats
        .iter()
        .any(|spec| spec.format == ECHO_PROOF_FORMAT));

    let verified = verifier_side
        .process_presentation(presentation)
        .await
        .unwrap();
    assert!(verified);
}

#[tokio::test]
async fn every_matching_credential_format_contributes_to_each_step() {
    let (holder, issuer) = two_format_issuance_coordinators();

    let proposal = holder
        .create_proposal(&json!({ "cred_def_id": "cd:1" }), None)
        .await
        .unwrap();
    let thread_id = proposal.exchange_thread_id().to_owned();
    assert_eq!(proposal.formats.len(), 2);

    issuer.process_proposal(proposal).await.unwrap();
    let offer = issuer.accept_proposal(&thread_id).await.unwrap();
    assert_eq!(offer.formats.len(), 2);
    assert!(offer
        .formats
        .iter()
        .any(|spec| spec.format == ECHO_CRED_OFFER_FORMAT));

    holder.process_offer(offer).await.unwrap();
    let request = holder.accept_offer(&thread_id).await.unwrap();
    assert_eq!(request.formats.len(), 2);

    issuer.process_request(request).await.unwrap();
    let values = HashMap::from([("name".to_owned(), "Alice".to_owned())]);
    let issue = issuer.accept_request(&thread_id, &values).await.unwrap();
    assert_eq!(issue.formats.len(), 2);
    assert!(issue
        .formats
        .iter()
        .any(|spec| spec.format == ECHO_CRED_FORMAT));

    // Every matching service stores its credential; the first registered
    // service's referent is reported.
    let referent = holder.process_credential(issue).await.unwrap();
    assert_eq!(referent, "stored-cred-0");
}
