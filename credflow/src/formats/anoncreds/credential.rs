use std::{collections::HashMap, sync::Arc};

use anoncreds_types::identifiers::CredentialDefinitionId;
use async_trait::async_trait;
use credflow_messages::decorators::attachment::Attachment;
use credflow_vdr::AnoncredsVdrRead;
use log::trace;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{
    ANONCREDS_CREDENTIAL_FORMAT, ANONCREDS_FILTER_FORMAT, ANONCREDS_OFFER_FORMAT,
    ANONCREDS_REQUEST_FORMAT,
};
use crate::{
    anoncreds::{AnonCredsHolder, AnonCredsIssuer},
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
    formats::{credential::CredentialFormatService, FormatAttachment},
};

/// Issues and receives anoncreds credentials. Credential request metadata
/// produced while accepting an offer is kept per thread until the issued
/// credential arrives and is stored.
#[derive(Debug)]
pub struct AnonCredsCredentialFormatService {
    vdr: Arc<dyn AnoncredsVdrRead>,
    issuer: Arc<dyn AnonCredsIssuer>,
    holder: Arc<dyn AnonCredsHolder>,
    request_metadata: Mutex<HashMap<String, Value>>,
}

impl AnonCredsCredentialFormatService {
    pub fn new(
        vdr: Arc<dyn AnoncredsVdrRead>,
        issuer: Arc<dyn AnonCredsIssuer>,
        holder: Arc<dyn AnonCredsHolder>,
    ) -> Self {
        Self {
            vdr,
            issuer,
            holder,
            request_metadata: Mutex::new(HashMap::new()),
        }
    }

    fn cred_def_id_of(payload: &Value) -> CredflowResult<CredentialDefinitionId> {
        payload
            .get("cred_def_id")
            .and_then(Value::as_str)
            .map(CredentialDefinitionId::from)
            .ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::InvalidInput,
                    "Payload is missing the cred_def_id field",
                )
            })
    }
}

#[async_trait]
impl CredentialFormatService for AnonCredsCredentialFormatService {
    fn supports(&self, format: &str) -> bool {
        [
            ANONCREDS_FILTER_FORMAT,
            ANONCREDS_OFFER_FORMAT,
            ANONCREDS_REQUEST_FORMAT,
            ANONCREDS_CREDENTIAL_FORMAT,
        ]
        .contains(&format)
    }

    async fn create_proposal(
        &self,
        thread_id: &str,
        filter: &Value,
    ) -> CredflowResult<FormatAttachment> {
        trace!("create_proposal >>> thread_id: {thread_id}");
        Ok(FormatAttachment::base64_json(ANONCREDS_FILTER_FORMAT, filter))
    }

    async fn accept_proposal(
        &self,
        thread_id: &str,
        proposal: &Attachment,
    ) -> CredflowResult<FormatAttachment> {
        trace!("accept_proposal >>> thread_id: {thread_id}");
        let filter = proposal.as_json()?;
        let cred_def_id = Self::cred_def_id_of(&filter)?;
        let offer = self.issuer.create_credential_offer(&cred_def_id).await?;
        Ok(FormatAttachment::base64_json(ANONCREDS_OFFER_FORMAT, &offer))
    }

    async fn create_offer(
        &self,
        thread_id: &str,
        input: &Value,
    ) -> CredflowResult<FormatAttachment> {
        trace!("create_offer >>> thread_id: {thread_id}");
        let cred_def_id = Self::cred_def_id_of(input)?;
        let offer = self.issuer.create_credential_offer(&cred_def_id).await?;
        Ok(FormatAttachment::base64_json(ANONCREDS_OFFER_FORMAT, &offer))
    }

    async fn accept_offer(
        &self,
        thread_id: &str,
        offer: &Attachment,
    ) -> CredflowResult<FormatAttachment> {
        trace!("accept_offer >>> thread_id: {thread_id}");
        let offer = offer.as_json()?;
        let cred_def_id = Self::cred_def_id_of(&offer)?;
        let cred_def = self.vdr.get_cred_def(&cred_def_id).await?;
        let (request, metadata) = self
            .holder
            .create_credential_request(&offer, &cred_def)
            .await?;

        self.request_metadata
            .lock()
            .await
            .insert(thread_id.to_owned(), metadata);

        Ok(FormatAttachment::base64_json(
            ANONCREDS_REQUEST_FORMAT,
            &request,
        ))
    }

    async fn accept_request(
        &self,
        thread_id: &str,
        offer: &Attachment,
        request: &Attachment,
        values: &HashMap<String, String>,
    ) -> CredflowResult<FormatAttachment> {
        trace!("accept_request >>> thread_id: {thread_id}");
        let offer = offer.as_json()?;
        let request = request.as_json()?;
        let credential = self.issuer.create_credential(&offer, &request, values).await?;
        Ok(FormatAttachment::base64_json(
            ANONCREDS_CREDENTIAL_FORMAT,
            &credential,
        ))
    }

    async fn process_credential(
        &self,
        thread_id: &str,
        credential: &Attachment,
    ) -> CredflowResult<String> {
        trace!("process_credential >>> thread_id: {thread_id}");
        let credential = credential.as_json()?;

        let metadata = self
            .request_metadata
            .lock()
            .await
            .remove(thread_id)
            .ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::InvalidState,
                    format!("No credential request metadata for thread {thread_id}"),
                )
            })?;

        let cred_def_id = Self::cred_def_id_of(&credential)?;
        let cred_def = self.vdr.get_cred_def(&cred_def_id).await?;
        self.holder
            .store_credential(&metadata, &credential, &cred_def)
            .await
    }
}
