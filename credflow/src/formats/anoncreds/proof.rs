use std::sync::Arc;

use anoncreds_types::{
    credential::{RequestedAttribute, RequestedCredentials, RequestedPredicate},
    encoding::is_valid_encoding,
    pres_request::{NonRevokedInterval, PresentationRequestPayload},
    presentation::Presentation,
};
use async_trait::async_trait;
use chrono::Utc;
use credflow_messages::decorators::attachment::Attachment;
use credflow_vdr::{AnoncredsVdrRead, TailsFileService};
use log::{debug, trace};

use super::{ANONCREDS_PROOF_FORMAT, ANONCREDS_PROOF_REQUEST_FORMAT};
use crate::{
    anoncreds::{AnonCredsHolder, AnonCredsVerifier},
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
    formats::{proof::ProofFormatService, FormatAttachment},
    ledger::{fetch_cred_defs, fetch_schemas},
    revocation::{
        apply_interval_overrides, build_revocation_states, collect_verification_registry_data,
        CredentialWithMetadata, RevocationReconciler,
    },
};

#[derive(Debug)]
pub struct AnonCredsProofFormatService {
    vdr: Arc<dyn AnoncredsVdrRead>,
    tails: Arc<dyn TailsFileService>,
    holder: Arc<dyn AnonCredsHolder>,
    verifier: Arc<dyn AnonCredsVerifier>,
}

impl AnonCredsProofFormatService {
    pub fn new(
        vdr: Arc<dyn AnoncredsVdrRead>,
        tails: Arc<dyn TailsFileService>,
        holder: Arc<dyn AnonCredsHolder>,
        verifier: Arc<dyn AnonCredsVerifier>,
    ) -> Self {
        Self {
            vdr,
            tails,
            holder,
            verifier,
        }
    }

    /// Structural validation applied to every request before any network
    /// access: unambiguous group names and well-shaped revocation
    /// intervals.
    fn validate_request(request: &PresentationRequestPayload) -> CredflowResult<()> {
        request.assert_no_duplicate_group_names().map_err(|err| {
            CredflowError::from_msg(CredflowErrorKind::SemanticMismatch, err)
        })?;

        let intervals = request
            .non_revoked
            .iter()
            .chain(
                request
                    .requested_attributes
                    .values()
                    .filter_map(|info| info.non_revoked.as_ref()),
            )
            .chain(
                request
                    .requested_predicates
                    .values()
                    .filter_map(|info| info.non_revoked.as_ref()),
            );
        for interval in intervals {
            interval.assert_best_practice().map_err(|err| {
                CredflowError::from_msg(CredflowErrorKind::InvalidRevocationInterval, err)
            })?;
        }
        Ok(())
    }

    /// Picks the first stored credential able to answer the referent.
    async fn select_credential(
        &self,
        request: &PresentationRequestPayload,
        referent: &str,
    ) -> CredflowResult<anoncreds_types::credential::CredentialInfo> {
        let mut candidates = self
            .holder
            .get_credentials_for_proof_request(request, referent)
            .await?;
        if candidates.is_empty() {
            return Err(CredflowError::from_msg(
                CredflowErrorKind::InvalidState,
                format!("No stored credential can answer referent {referent}"),
            ));
        }
        Ok(candidates.swap_remove(0))
    }

    /// Whether every revealed attribute's claimed encoding matches its raw
    /// value. A mismatch means the prover revealed a different value than
    /// it proved.
    fn encodings_are_valid(presentation: &Presentation) -> bool {
        let requested_proof = &presentation.requested_proof;
        let revealed = requested_proof
            .revealed_attrs
            .values()
            .map(|info| (&info.raw, &info.encoded))
            .chain(
                requested_proof
                    .revealed_attr_groups
                    .values()
                    .flat_map(|group| group.values.values())
                    .map(|value| (&value.raw, &value.encoded)),
            );
        revealed.into_iter().all(|(raw, encoded)| is_valid_encoding(raw, encoded))
    }
}

#[async_trait]
impl ProofFormatService for AnonCredsProofFormatService {
    fn supports(&self, format: &str) -> bool {
        [ANONCREDS_PROOF_REQUEST_FORMAT, ANONCREDS_PROOF_FORMAT].contains(&format)
    }

    async fn create_proposal(
        &self,
        proposal: &PresentationRequestPayload,
    ) -> CredflowResult<FormatAttachment> {
        Self::validate_request(proposal)?;
        Ok(FormatAttachment::base64_json(
            ANONCREDS_PROOF_REQUEST_FORMAT,
            &serde_json::to_value(proposal)?,
        ))
    }

    async fn accept_proposal(&self, proposal: &Attachment) -> CredflowResult<FormatAttachment> {
        let mut request: PresentationRequestPayload =
            serde_json::from_value(proposal.as_json()?)?;
        Self::validate_request(&request)?;
        request.nonce = self.verifier.generate_nonce().await?;
        Ok(FormatAttachment::base64_json(
            ANONCREDS_PROOF_REQUEST_FORMAT,
            &serde_json::to_value(&request)?,
        ))
    }

    async fn create_request(
        &self,
        request: &PresentationRequestPayload,
    ) -> CredflowResult<FormatAttachment> {
        Self::validate_request(request)?;
        Ok(FormatAttachment::base64_json(
            ANONCREDS_PROOF_REQUEST_FORMAT,
            &serde_json::to_value(request)?,
        ))
    }

    async fn process_request(
        &self,
        request: &Attachment,
    ) -> CredflowResult<PresentationRequestPayload> {
        let request: PresentationRequestPayload = serde_json::from_value(request.as_json()?)?;
        Self::validate_request(&request)?;
        Ok(request)
    }

    async fn accept_request(&self, request: &Attachment) -> CredflowResult<FormatAttachment> {
        let request: PresentationRequestPayload = serde_json::from_value(request.as_json()?)?;
        trace!("accept_request >>> request: {}", request.name);
        Self::validate_request(&request)?;

        // Select one credential per referent, carrying the interval that
        // governs it.
        let mut selected: Vec<CredentialWithMetadata> = Vec::new();
        let mut attribute_referents: Vec<(String, usize)> = Vec::new();
        let mut predicate_referents: Vec<(String, usize)> = Vec::new();

        for (referent, info) in &request.requested_attributes {
            let credential = self.select_credential(&request, referent).await?;
            let interval = effective_interval(&request, info.non_revoked.as_ref());
            attribute_referents.push((referent.clone(), selected.len()));
            selected.push(CredentialWithMetadata::new(credential, interval));
        }
        for (referent, info) in &request.requested_predicates {
            let credential = self.select_credential(&request, referent).await?;
            let interval = effective_interval(&request, info.non_revoked.as_ref());
            predicate_referents.push((referent.clone(), selected.len()));
            selected.push(CredentialWithMetadata::new(credential, interval));
        }

        let now = Utc::now().timestamp() as u64;
        let reconciler = RevocationReconciler::new(&*self.vdr);
        let rev_states = build_revocation_states(
            &reconciler,
            &*self.holder,
            &*self.tails,
            &mut selected,
            now,
        )
        .await?;

        let mut credentials = RequestedCredentials::default();
        for (referent, index) in attribute_referents {
            let with_meta = &selected[index];
            let mut attribute = RequestedAttribute::builder()
                .cred_id(with_meta.credential.referent.clone())
                .revealed(true)
                .build();
            attribute.timestamp = with_meta.timestamp;
            credentials.requested_attributes.insert(referent, attribute);
        }
        for (referent, index) in predicate_referents {
            let with_meta = &selected[index];
            let mut predicate = RequestedPredicate::builder()
                .cred_id(with_meta.credential.referent.clone())
                .build();
            predicate.timestamp = with_meta.timestamp;
            credentials.requested_predicates.insert(referent, predicate);
        }

        let schemas = fetch_schemas(
            &*self.vdr,
            selected.iter().map(|c| c.credential.schema_id.clone()),
        )
        .await?;
        let cred_defs = fetch_cred_defs(
            &*self.vdr,
            selected.iter().map(|c| c.credential.cred_def_id.clone()),
        )
        .await?;

        let presentation = self
            .holder
            .create_presentation(&request, &credentials, &schemas, &cred_defs, &rev_states)
            .await?;

        Ok(FormatAttachment::base64_json(
            ANONCREDS_PROOF_FORMAT,
            &serde_json::to_value(&presentation)?,
        ))
    }

    async fn verify_presentation(
        &self,
        request: &Attachment,
        presentation: &Attachment,
    ) -> CredflowResult<bool> {
        let request: PresentationRequestPayload = serde_json::from_value(request.as_json()?)?;
        let presentation: Presentation = serde_json::from_value(presentation.as_json()?)?;
        Self::validate_request(&request)?;

        if !Self::encodings_are_valid(&presentation) {
            debug!("verify_presentation <<< revealed attribute encoding mismatch");
            return Ok(false);
        }

        let reconciler = RevocationReconciler::new(&*self.vdr);
        let registry_data =
            match collect_verification_registry_data(&reconciler, &request, &presentation).await {
                Ok(data) => data,
                Err(err) if err.kind() == CredflowErrorKind::RevocationWindowMismatch => {
                    debug!("verify_presentation <<< {err}");
                    return Ok(false);
                }
                Err(err) => return Err(err),
            };

        let schemas = fetch_schemas(
            &*self.vdr,
            presentation.identifiers.iter().map(|i| i.schema_id.clone()),
        )
        .await?;
        let cred_defs = fetch_cred_defs(
            &*self.vdr,
            presentation
                .identifiers
                .iter()
                .map(|i| i.cred_def_id.clone()),
        )
        .await?;

        let request_to_verify = apply_interval_overrides(&request, &registry_data.overrides);
        self.verifier
            .verify_presentation(
                &request_to_verify,
                &presentation,
                &schemas,
                &cred_defs,
                &registry_data.rev_reg_defs,
                &registry_data.rev_status_lists,
            )
            .await
    }
}

/// The group interval when present, otherwise the request-level one.
fn effective_interval(
    request: &PresentationRequestPayload,
    group: Option<&NonRevokedInterval>,
) -> Option<NonRevokedInterval> {
    group.or(request.non_revoked.as_ref()).cloned()
}
