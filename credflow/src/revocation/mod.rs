//! Reconciliation of requested non-revocation intervals against the actual
//! state of a revocation registry.
//!
//! A verifier asks for non-revocation at a point in time; the registry only
//! has states at the times entries were published. Reconciliation resolves
//! the requested time to a published state and decides whether the
//! difference is benign (nothing changed in between, recorded as an
//! explicit override) or fatal (the registry changed inside the requested
//! window).

use std::{collections::HashMap, sync::Arc};

use anoncreds_types::{
    credential::CredentialInfo,
    identifiers::RevocationRegistryDefinitionId,
    ledger::{rev_reg_def::RevocationRegistryDefinition, rev_status_list::RevocationStatusList},
    pres_request::{NonRevokedInterval, PresentationRequestPayload},
    presentation::Presentation,
};
use credflow_vdr::{AnoncredsVdrRead, TailsFileService};
use futures::future::try_join_all;
use log::trace;
use serde_json::{json, Value};
use tokio::sync::{Mutex, OnceCell};

use crate::{
    anoncreds::{AnonCredsHolder, RevRegDefsMap},
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
};

/// What the reconciler needs to know about one credential's revocation
/// situation. Never persisted.
#[derive(Clone, Debug)]
pub struct RevocationRegistryFetchMetadata {
    pub registry_id: RevocationRegistryDefinitionId,
    /// The credential's index within the registry, set when a membership
    /// state must be produced (proof construction).
    pub registry_index: Option<String>,
    pub non_revoked_interval: NonRevokedInterval,
    /// A timestamp already pinned by the other side (verification), taking
    /// precedence over the interval's `to`.
    pub timestamp: Option<u64>,
}

/// Permission for the verifier to accept non-revocation proven at an
/// earlier timestamp than the interval requested, because the registry
/// provably did not change in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonRevokedIntervalOverride {
    pub rev_reg_def_id: RevocationRegistryDefinitionId,
    pub requested_from_timestamp: u64,
    pub override_revocation_status_list_timestamp: u64,
}

#[derive(Clone, Debug)]
pub struct ReconciledRevocation {
    pub rev_reg_def: Arc<RevocationRegistryDefinition>,
    pub status_list: Arc<RevocationStatusList>,
    pub resolved_timestamp: u64,
    pub interval_override: Option<NonRevokedIntervalOverride>,
}

type FetchKey = (RevocationRegistryDefinitionId, u64);

#[derive(Clone, Debug)]
struct FetchedRegistry {
    def: Arc<RevocationRegistryDefinition>,
    status_list: Arc<RevocationStatusList>,
}

/// Resolves revocation intervals against the registry, fetching each
/// (registry, timestamp) pair at most once even across a concurrent
/// fan-out.
pub struct RevocationReconciler<'a> {
    vdr: &'a dyn AnoncredsVdrRead,
    cache: Mutex<HashMap<FetchKey, Arc<OnceCell<FetchedRegistry>>>>,
}

impl<'a> RevocationReconciler<'a> {
    pub fn new(vdr: &'a dyn AnoncredsVdrRead) -> Self {
        Self {
            vdr,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn fetch(
        &self,
        registry_id: &RevocationRegistryDefinitionId,
        timestamp: u64,
    ) -> CredflowResult<FetchedRegistry> {
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(
                cache
                    .entry((registry_id.clone(), timestamp))
                    .or_default(),
            )
        };

        cell.get_or_try_init(|| async {
            trace!("fetch >>> registry_id: {registry_id}, timestamp: {timestamp}");
            let def = self.vdr.get_rev_reg_def(registry_id).await?;
            let status_list = self.vdr.get_rev_status_list(registry_id, timestamp).await?;
            Ok::<_, CredflowError>(FetchedRegistry {
                def: Arc::new(def),
                status_list: Arc::new(status_list),
            })
        })
        .await
        .cloned()
    }

    /// Resolves one credential's non-revocation interval to a published
    /// registry state.
    ///
    /// When the interval's `from` lies after the resolved state, the state
    /// published at `from` is consulted: if it is the same state, an
    /// override is emitted; if the registry changed in between, the
    /// reconciliation fails with `RevocationWindowMismatch`.
    pub async fn reconcile(
        &self,
        meta: &RevocationRegistryFetchMetadata,
    ) -> CredflowResult<ReconciledRevocation> {
        let interval = &meta.non_revoked_interval;
        interval.assert_best_practice().map_err(|err| {
            CredflowError::from_msg(CredflowErrorKind::InvalidRevocationInterval, err)
        })?;

        let timestamp_to_fetch = meta.timestamp.or(interval.to).ok_or_else(|| {
            CredflowError::from_msg(
                CredflowErrorKind::MissingTimestamp,
                format!(
                    "No timestamp to resolve revocation state of registry {}",
                    meta.registry_id
                ),
            )
        })?;

        let fetched = self.fetch(&meta.registry_id, timestamp_to_fetch).await?;
        let resolved_timestamp = fetched.status_list.timestamp;

        let mut interval_override = None;
        if let Some(from) = interval.from {
            if from > resolved_timestamp {
                let at_from = self.fetch(&meta.registry_id, from).await?;
                if at_from.status_list.timestamp == resolved_timestamp {
                    interval_override = Some(NonRevokedIntervalOverride {
                        rev_reg_def_id: meta.registry_id.clone(),
                        requested_from_timestamp: from,
                        override_revocation_status_list_timestamp: resolved_timestamp,
                    });
                } else {
                    return Err(CredflowError::from_msg(
                        CredflowErrorKind::RevocationWindowMismatch,
                        format!(
                            "Registry {} changed between {} and {}: cannot prove \
                             non-revocation for the requested interval",
                            meta.registry_id, resolved_timestamp, from
                        ),
                    ));
                }
            }
        }

        Ok(ReconciledRevocation {
            rev_reg_def: fetched.def,
            status_list: fetched.status_list,
            resolved_timestamp,
            interval_override,
        })
    }
}

/// One selected credential while a presentation is being assembled. The
/// timestamp is filled in by reconciliation.
#[derive(Clone, Debug)]
pub struct CredentialWithMetadata {
    pub credential: CredentialInfo,
    pub non_revoked_interval: Option<NonRevokedInterval>,
    pub timestamp: Option<u64>,
}

impl CredentialWithMetadata {
    pub fn new(credential: CredentialInfo, non_revoked_interval: Option<NonRevokedInterval>) -> Self {
        Self {
            credential,
            non_revoked_interval,
            timestamp: None,
        }
    }
}

/// Builds the revocation states for a presentation, filling each
/// credential's resolved timestamp in place. Returns the states keyed by
/// registry id then timestamp, the shape provers consume.
///
/// Credentials without a registry or without a requested interval prove
/// nothing about revocation and are skipped. Independent registries are
/// fetched concurrently; the first failure aborts the whole batch.
pub async fn build_revocation_states(
    reconciler: &RevocationReconciler<'_>,
    holder: &dyn AnonCredsHolder,
    tails: &dyn TailsFileService,
    credentials: &mut [CredentialWithMetadata],
    now: u64,
) -> CredflowResult<Value> {
    let work: Vec<(usize, RevocationRegistryFetchMetadata)> = credentials
        .iter()
        .enumerate()
        .filter_map(|(index, with_meta)| {
            let rev_reg_id = with_meta.credential.rev_reg_id.clone()?;
            let cred_rev_id = with_meta.credential.cred_rev_id.clone()?;
            let interval = with_meta.non_revoked_interval.clone()?;
            // A missing `to` resolves to the present moment.
            let interval = NonRevokedInterval::new(interval.from, interval.to.or(Some(now)));
            Some((
                index,
                RevocationRegistryFetchMetadata {
                    registry_id: rev_reg_id,
                    registry_index: Some(cred_rev_id),
                    non_revoked_interval: interval,
                    timestamp: None,
                },
            ))
        })
        .collect();

    let resolutions = try_join_all(work.iter().map(|(index, meta)| async move {
        let reconciled = reconciler.reconcile(meta).await?;
        let tails_path = tails.download_tails_file(&reconciled.rev_reg_def).await?;
        let registry_index = meta
            .registry_index
            .as_deref()
            .unwrap_or_default();
        let state = holder
            .create_revocation_state(
                &tails_path,
                &reconciled.rev_reg_def,
                &reconciled.status_list,
                registry_index,
            )
            .await?;
        Ok::<_, CredflowError>((*index, meta.registry_id.clone(), reconciled, state))
    }))
    .await?;

    let mut states = json!({});
    for (index, registry_id, reconciled, state) in resolutions {
        credentials[index].timestamp = Some(reconciled.resolved_timestamp);
        states[registry_id.0.as_str()][reconciled.resolved_timestamp.to_string()] = state;
    }
    Ok(states)
}

/// The registry inputs a verifier needs: definitions and status lists per
/// registry used by the presentation, plus any interval overrides.
#[derive(Debug, Default)]
pub struct VerificationRegistryData {
    pub rev_reg_defs: RevRegDefsMap,
    pub rev_status_lists: Vec<RevocationStatusList>,
    pub overrides: Vec<NonRevokedIntervalOverride>,
}

/// Collects the revocation inputs for verifying a presentation. Every
/// identifier carrying a registry id is reconciled against the interval
/// the request put on its referents.
pub async fn collect_verification_registry_data(
    reconciler: &RevocationReconciler<'_>,
    request: &PresentationRequestPayload,
    presentation: &Presentation,
) -> CredflowResult<VerificationRegistryData> {
    let mut work = Vec::new();
    for (sub_proof_index, identifier) in presentation.identifiers.iter().enumerate() {
        let Some(rev_reg_id) = identifier.rev_reg_id.clone() else {
            continue;
        };
        let Some(interval) = interval_for_sub_proof(request, presentation, sub_proof_index as u32)
        else {
            if identifier.timestamp.is_some() {
                return Err(CredflowError::from_msg(
                    CredflowErrorKind::InvalidRevocationInterval,
                    format!(
                        "Presentation pins a timestamp for registry {rev_reg_id} but the \
                         request has no revocation interval"
                    ),
                ));
            }
            continue;
        };

        if identifier.timestamp.is_none() {
            return Err(CredflowError::from_msg(
                CredflowErrorKind::MissingTimestamp,
                format!("Presentation is missing a timestamp for registry {rev_reg_id}"),
            ));
        }

        work.push(RevocationRegistryFetchMetadata {
            registry_id: rev_reg_id,
            registry_index: None,
            non_revoked_interval: interval,
            timestamp: identifier.timestamp,
        });
    }

    let reconciled = try_join_all(work.iter().map(|meta| reconciler.reconcile(meta))).await?;

    let mut data = VerificationRegistryData::default();
    for (meta, resolution) in work.into_iter().zip(reconciled) {
        data.rev_reg_defs
            .entry(meta.registry_id)
            .or_insert_with(|| (*resolution.rev_reg_def).clone());
        data.rev_status_lists.push((*resolution.status_list).clone());
        if let Some(interval_override) = resolution.interval_override {
            data.overrides.push(interval_override);
        }
    }
    Ok(data)
}

/// The interval governing one sub-proof: the most stringent combination of
/// the request-level interval and the intervals of every group answered by
/// that sub-proof. `None` when no interval applies at all.
fn interval_for_sub_proof(
    request: &PresentationRequestPayload,
    presentation: &Presentation,
    sub_proof_index: u32,
) -> Option<NonRevokedInterval> {
    let requested_proof = &presentation.requested_proof;
    let mut referents: Vec<&str> = Vec::new();

    referents.extend(
        requested_proof
            .revealed_attrs
            .iter()
            .filter(|(_, info)| info.sub_proof_index == sub_proof_index)
            .map(|(referent, _)| referent.as_str()),
    );
    referents.extend(
        requested_proof
            .revealed_attr_groups
            .iter()
            .filter(|(_, info)| info.sub_proof_index == sub_proof_index)
            .map(|(referent, _)| referent.as_str()),
    );
    referents.extend(
        requested_proof
            .unrevealed_attrs
            .iter()
            .chain(requested_proof.predicates.iter())
            .filter(|(_, info)| info.sub_proof_index == sub_proof_index)
            .map(|(referent, _)| referent.as_str()),
    );

    let mut interval: Option<NonRevokedInterval> = request.non_revoked.clone();
    for referent in referents {
        let group_interval = request
            .requested_attributes
            .get(referent)
            .and_then(|info| info.non_revoked.as_ref())
            .or_else(|| {
                request
                    .requested_predicates
                    .get(referent)
                    .and_then(|info| info.non_revoked.as_ref())
            });
        if let Some(group_interval) = group_interval {
            match interval.as_mut() {
                Some(interval) => interval.compare_and_set(group_interval),
                None => interval = Some(group_interval.clone()),
            }
        }
    }
    interval.filter(|interval| interval != &NonRevokedInterval::default())
}

/// Applies the reconciled overrides to a copy of the request, producing
/// the request the cryptographic verifier must be given.
pub fn apply_interval_overrides(
    request: &PresentationRequestPayload,
    overrides: &[NonRevokedIntervalOverride],
) -> PresentationRequestPayload {
    let override_map: HashMap<u64, u64> = overrides
        .iter()
        .map(|o| {
            (
                o.requested_from_timestamp,
                o.override_revocation_status_list_timestamp,
            )
        })
        .collect();

    let mut request = request.clone();
    if let Some(interval) = request.non_revoked.as_mut() {
        interval.update_with_override(&override_map);
    }
    for info in request.requested_attributes.values_mut() {
        if let Some(interval) = info.non_revoked.as_mut() {
            interval.update_with_override(&override_map);
        }
    }
    for info in request.requested_predicates.values_mut() {
        if let Some(interval) = info.non_revoked.as_mut() {
            interval.update_with_override(&override_map);
        }
    }
    request
}
