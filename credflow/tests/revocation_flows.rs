//! Reconciliation of requested non-revocation intervals against registry
//! state, including the interval-override and window-mismatch paths.

use std::{collections::HashMap, sync::Arc};

use anoncreds_types::{
    identifiers::RevocationRegistryDefinitionId,
    nonce::Nonce,
    pres_request::{AttributeInfo, NonRevokedInterval, PresentationRequestPayload},
    presentation::{Identifier, Presentation, RequestedProof, RevealedAttributeInfo},
};
use credflow::{
    errors::CredflowErrorKind,
    formats::{anoncreds::proof::AnonCredsProofFormatService, proof::ProofFormatService},
    messages::decorators::attachment::Attachment,
    revocation::{
        build_revocation_states, CredentialWithMetadata, RevocationRegistryFetchMetadata,
        RevocationReconciler,
    },
};
use serde_json::json;
use test_utils::{
    fixtures,
    mock_anoncreds::{MockHolder, MockVerifier},
    mock_vdr::{MockTailsFileService, MockVdr},
};

const REGISTRY: &str = "rev-reg:1";

fn registry_vdr(status_list_timestamps: &[u64]) -> MockVdr {
    let mut vdr = MockVdr::new()
        .with_schema(fixtures::schema("schema:1"))
        .with_cred_def(fixtures::cred_def("cd:1", "schema:1"))
        .with_rev_reg_def(fixtures::rev_reg_def(REGISTRY, "cd:1"));
    for &timestamp in status_list_timestamps {
        vdr = vdr.with_status_list(fixtures::status_list(REGISTRY, timestamp, &[0, 0, 0, 0]));
    }
    vdr
}

fn fetch_metadata(
    interval: NonRevokedInterval,
    timestamp: Option<u64>,
) -> RevocationRegistryFetchMetadata {
    RevocationRegistryFetchMetadata {
        registry_id: RevocationRegistryDefinitionId::from(REGISTRY),
        registry_index: Some("1".to_owned()),
        non_revoked_interval: interval,
        timestamp,
    }
}

fn revocable_request(interval: NonRevokedInterval) -> PresentationRequestPayload {
    PresentationRequestPayload::builder()
        .nonce(Nonce::from_dec("123456789012").unwrap())
        .name("revocable proof".to_owned())
        .version("1.0".to_owned())
        .requested_attributes(HashMap::from([(
            "attr1_referent".to_owned(),
            AttributeInfo::builder().name("name".to_owned()).build(),
        )]))
        .non_revoked(interval)
        .build()
}

#[tokio::test]
async fn interval_resolves_to_published_state() {
    let vdr = registry_vdr(&[100]);
    let reconciler = RevocationReconciler::new(&vdr);

    let reconciled = reconciler
        .reconcile(&fetch_metadata(NonRevokedInterval::new(None, Some(100)), None))
        .await
        .unwrap();

    assert_eq!(reconciled.resolved_timestamp, 100);
    assert!(reconciled.interval_override.is_none());
}

#[tokio::test]
async fn unchanged_registry_yields_interval_override() {
    // The registry has no entry after 80, so the state resolved for `to`
    // is older than the requested `from`. Nothing changed in between, so
    // accepting the older state is recorded as an override.
    let vdr = registry_vdr(&[80]);
    let reconciler = RevocationReconciler::new(&vdr);

    let reconciled = reconciler
        .reconcile(&fetch_metadata(
            NonRevokedInterval::new(Some(90), Some(100)),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(reconciled.resolved_timestamp, 80);
    let interval_override = reconciled.interval_override.unwrap();
    assert_eq!(interval_override.requested_from_timestamp, 90);
    assert_eq!(
        interval_override.override_revocation_status_list_timestamp,
        80
    );
}

#[tokio::test]
async fn changed_registry_fails_with_window_mismatch() {
    // A state was published at 85, inside the window between the pinned
    // timestamp and the requested `from`.
    let vdr = registry_vdr(&[80, 85]);
    let reconciler = RevocationReconciler::new(&vdr);

    let err = reconciler
        .reconcile(&fetch_metadata(
            NonRevokedInterval::new(Some(90), Some(100)),
            Some(80),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), CredflowErrorKind::RevocationWindowMismatch);
}

#[tokio::test]
async fn malformed_interval_fails_before_any_fetch() {
    let vdr = registry_vdr(&[]);
    let reconciler = RevocationReconciler::new(&vdr);

    let err = reconciler
        .reconcile(&fetch_metadata(
            NonRevokedInterval::new(Some(100), Some(90)),
            None,
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), CredflowErrorKind::InvalidRevocationInterval);
    assert_eq!(vdr.status_list_fetch_count(), 0);
}

#[tokio::test]
async fn empty_interval_without_pinned_timestamp_fails() {
    let vdr = registry_vdr(&[]);
    let reconciler = RevocationReconciler::new(&vdr);

    let err = reconciler
        .reconcile(&RevocationRegistryFetchMetadata {
            registry_id: RevocationRegistryDefinitionId::from(REGISTRY),
            registry_index: None,
            non_revoked_interval: NonRevokedInterval::default(),
            timestamp: None,
        })
        .await
        .unwrap_err();

    // The missing `to` is caught by the best-practice check already.
    assert_eq!(err.kind(), CredflowErrorKind::InvalidRevocationInterval);
}

#[tokio::test]
async fn shared_registry_is_fetched_once_across_fan_out() {
    let vdr = registry_vdr(&[100]);
    let reconciler = RevocationReconciler::new(&vdr);
    let holder = MockHolder::with_credentials(vec![]);
    let interval = NonRevokedInterval::new(None, Some(100));

    let mut credentials = vec![
        CredentialWithMetadata::new(
            fixtures::credential_info("cred-1", "schema:1", "cd:1", Some(REGISTRY)),
            Some(interval.clone()),
        ),
        CredentialWithMetadata::new(
            fixtures::credential_info("cred-2", "schema:1", "cd:1", Some(REGISTRY)),
            Some(interval),
        ),
    ];

    let states = build_revocation_states(
        &reconciler,
        &holder,
        &MockTailsFileService,
        &mut credentials,
        200,
    )
    .await
    .unwrap();

    assert_eq!(vdr.status_list_fetch_count(), 1);
    assert_eq!(credentials[0].timestamp, Some(100));
    assert_eq!(credentials[1].timestamp, Some(100));
    assert!(states[REGISTRY]["100"].is_object());
}

#[tokio::test]
async fn presentation_flow_applies_interval_override() {
    // Proof construction resolves {from: 90, to: 100} to the state
    // published at 85; verification accepts it and rewrites the request's
    // `from` before handing it to the cryptographic verifier.
    let vdr = Arc::new(registry_vdr(&[85]));
    let holder = Arc::new(MockHolder::with_credentials(vec![
        fixtures::credential_info("cred-1", "schema:1", "cd:1", Some(REGISTRY)),
    ]));
    let verifier = Arc::new(MockVerifier::default());
    let service = AnonCredsProofFormatService::new(
        vdr.clone(),
        Arc::new(MockTailsFileService),
        holder,
        verifier.clone(),
    );

    let request = revocable_request(NonRevokedInterval::new(Some(90), Some(100)));
    let request_attachment = Attachment::base64_json(
        "request-1".to_owned(),
        &serde_json::to_value(&request).unwrap(),
    );

    let presentation = service.accept_request(&request_attachment).await.unwrap();
    let verified = service
        .verify_presentation(&request_attachment, &presentation.attachment)
        .await
        .unwrap();

    assert!(verified);
    let verified_request = verifier.last_verified_request().unwrap();
    assert_eq!(
        verified_request.non_revoked,
        Some(NonRevokedInterval::new(Some(85), Some(100)))
    );
}

#[tokio::test]
async fn stale_presentation_verifies_as_false() {
    // The prover pinned the state at 80, but the registry changed at 85,
    // inside the requested window. Verification must not error out.
    let vdr = Arc::new(registry_vdr(&[80, 85]));
    let holder = Arc::new(MockHolder::with_credentials(vec![]));
    let verifier = Arc::new(MockVerifier::default());
    let service = AnonCredsProofFormatService::new(
        vdr,
        Arc::new(MockTailsFileService),
        holder,
        verifier,
    );

    let request = revocable_request(NonRevokedInterval::new(Some(90), Some(100)));
    let request_attachment = Attachment::base64_json(
        "request-1".to_owned(),
        &serde_json::to_value(&request).unwrap(),
    );

    let presentation = Presentation {
        proof: json!({}),
        requested_proof: RequestedProof {
            revealed_attrs: HashMap::from([(
                "attr1_referent".to_owned(),
                RevealedAttributeInfo {
                    sub_proof_index: 0,
                    raw: "Alice".to_owned(),
                    encoded: anoncreds_types::encoding::encode_credential_attribute("Alice"),
                },
            )]),
            ..RequestedProof::default()
        },
        identifiers: vec![Identifier {
            schema_id: "schema:1".into(),
            cred_def_id: "cd:1".into(),
            rev_reg_id: Some(RevocationRegistryDefinitionId::from(REGISTRY)),
            timestamp: Some(80),
        }],
    };
    let presentation_attachment = Attachment::base64_json(
        "presentation-1".to_owned(),
        &serde_json::to_value(&presentation).unwrap(),
    );

    let verified = service
        .verify_presentation(&request_attachment, &presentation_attachment)
        .await
        .unwrap();
    assert!(!verified);
}

#[tokio::test]
async fn tampered_revealed_value_verifies_as_false() {
    let vdr = Arc::new(registry_vdr(&[]));
    let holder = Arc::new(MockHolder::with_credentials(vec![]));
    let verifier = Arc::new(MockVerifier::default());
    let service = AnonCredsProofFormatService::new(
        vdr,
        Arc::new(MockTailsFileService),
        holder,
        verifier,
    );

    let request = PresentationRequestPayload::builder()
        .nonce(Nonce::from_dec("123456789012").unwrap())
        .name("proof".to_owned())
        .version("1.0".to_owned())
        .requested_attributes(HashMap::from([(
            "attr1_referent".to_owned(),
            AttributeInfo::builder().name("name".to_owned()).build(),
        )]))
        .build();
    let request_attachment = Attachment::base64_json(
        "request-1".to_owned(),
        &serde_json::to_value(&request).unwrap(),
    );

    let presentation = Presentation {
        proof: json!({}),
        requested_proof: RequestedProof {
            revealed_attrs: HashMap::from([(
                "attr1_referent".to_owned(),
                RevealedAttributeInfo {
                    sub_proof_index: 0,
                    raw: "Mallory".to_owned(),
                    encoded: anoncreds_types::encoding::encode_credential_attribute("Alice"),
                },
            )]),
            ..RequestedProof::default()
        },
        identifiers: vec![Identifier {
            schema_id: "schema:1".into(),
            cred_def_id: "cd:1".into(),
            rev_reg_id: None,
            timestamp: None,
        }],
    };
    let presentation_attachment = Attachment::base64_json(
        "presentation-1".to_owned(),
        &serde_json::to_value(&presentation).unwrap(),
    );

    let verified = service
        .verify_presentation(&request_attachment, &presentation_attachment)
        .await
        .unwrap();
    assert!(!verified);
}
