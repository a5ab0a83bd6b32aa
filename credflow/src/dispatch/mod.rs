//! Inbound message dispatch. Handlers declare the message types they
//! support; an incoming message is routed to the first handler whose
//! declared type matches, with minor version differences tolerated.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use credflow_messages::{
    misc::generate_message_id,
    msg_fields::discover_features::{Disclose, ProtocolDescriptor, Query},
    msg_types::{registry::Role, MessageType, ProtocolUri},
};
use log::{trace, warn};
use serde_json::Value;

use crate::errors::{CredflowError, CredflowErrorKind, CredflowResult};

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// The message types this handler accepts. Matching follows
    /// [`MessageType::supports`], so only the major version is pinned.
    fn supported_types(&self) -> Vec<MessageType>;

    /// The protocol roles this handler implements, disclosed during
    /// feature discovery.
    fn roles(&self) -> Vec<Role>;

    async fn handle(&self, message: Value) -> CredflowResult<Option<Value>>;
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Arc<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn MessageHandler>) {
        self.handlers.push(handler);
    }

    /// Finds a handler for the incoming message type. An unsupported type
    /// is not an error: the caller decides how to report it.
    pub fn handler_for(&self, incoming: &MessageType) -> Option<&Arc<dyn MessageHandler>> {
        self.handlers.iter().find(|handler| {
            handler
                .supported_types()
                .iter()
                .any(|supported| supported.supports(incoming))
        })
    }

    pub async fn dispatch(&self, message: Value) -> CredflowResult<Option<Value>> {
        let type_str = message
            .get("@type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CredflowError::from_msg(
                    CredflowErrorKind::MalformedMessage,
                    "Message is missing the @type field",
                )
            })?;
        let msg_type: MessageType = type_str.parse()?;
        trace!("dispatch >>> msg_type: {msg_type}");

        match self.handler_for(&msg_type) {
            Some(handler) => handler.handle(message).await,
            None => {
                warn!("dispatch <<< no handler registered for {msg_type}");
                Ok(None)
            }
        }
    }

    /// All protocols the registered handlers implement, in registration
    /// order, each listed once regardless of how many handlers or message
    /// types it has.
    pub fn supported_protocols(&self) -> Vec<ProtocolDescriptor> {
        let mut seen: HashSet<ProtocolUri> = HashSet::new();
        let mut protocols = Vec::new();

        for handler in &self.handlers {
            let roles = handler.roles();
            for msg_type in handler.supported_types() {
                let protocol = msg_type.protocol_uri();
                if seen.insert(protocol.clone()) {
                    protocols.push(
                        ProtocolDescriptor::builder()
                            .pid(protocol)
                            .roles(roles.clone())
                            .build(),
                    );
                }
            }
        }
        protocols
    }

    /// Answers a discover-features query with the matching subset of the
    /// supported protocols, threaded to the query.
    pub fn handle_query(&self, query: &Query) -> Disclose {
        let protocols = self
            .supported_protocols()
            .into_iter()
            .filter(|descriptor| query.matches(&descriptor.pid))
            .collect();

        Disclose::builder()
            .id(generate_message_id())
            .thread(credflow_messages::decorators::thread::Thread::new(
                query.id.clone(),
            ))
            .protocols(protocols)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingHandler {
        types: Vec<MessageType>,
        roles: Vec<Role>,
        handled: Mutex<Vec<Value>>,
    }

    impl RecordingHandler {
        fn for_types(types: &[&str], roles: Vec<Role>) -> Arc<Self> {
            Arc::new(Self {
                types: types.iter().map(|t| t.parse().unwrap()).collect(),
                roles,
                handled: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        fn supported_types(&self) -> Vec<MessageType> {
            self.types.clone()
        }

        fn roles(&self) -> Vec<Role> {
            self.roles.clone()
        }

        async fn handle(&self, message: Value) -> CredflowResult<Option<Value>> {
            self.handled.lock().unwrap().push(message);
            Ok(None)
        }
    }

    fn present_proof_dispatcher() -> (Dispatcher, Arc<RecordingHandler>) {
        let handler = RecordingHandler::for_types(
            &[
                "https://didcomm.org/present-proof/2.0/request-presentation",
                "https://didcomm.org/present-proof/2.0/presentation",
            ],
            vec![Role::Prover, Role::Verifier],
        );
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(handler.clone());
        (dispatcher, handler)
    }

    #[tokio::test]
    async fn dispatches_to_matching_handler() {
        let (dispatcher, handler) = present_proof_dispatcher();

        dispatcher
            .dispatch(json!({
                "@type": "https://didcomm.org/present-proof/2.0/presentation",
                "@id": "1"
            }))
            .await
            .unwrap();

        assert_eq!(handler.handled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn newer_minor_version_is_dispatched() {
        let (dispatcher, handler) = present_proof_dispatcher();

        dispatcher
            .dispatch(json!({
                "@type": "https://didcomm.org/present-proof/2.3/presentation",
                "@id": "1"
            }))
            .await
            .unwrap();

        assert_eq!(handler.handled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn legacy_document_uri_is_dispatched() {
        let (dispatcher, handler) = present_proof_dispatcher();

        dispatcher
            .dispatch(json!({
                "@type": "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/2.0/presentation",
                "@id": "1"
            }))
            .await
            .unwrap();

        assert_eq!(handler.handled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_message_is_not_an_error() {
        let (dispatcher, handler) = present_proof_dispatcher();

        let outcome = dispatcher
            .dispatch(json!({
                "@type": "https://didcomm.org/basicmessage/1.0/message",
                "@id": "1"
            }))
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert!(handler.handled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_type_is_malformed() {
        let (dispatcher, _) = present_proof_dispatcher();

        let err = dispatcher.dispatch(json!({ "@id": "1" })).await.unwrap_err();
        assert_eq!(err.kind(), CredflowErrorKind::MalformedMessage);
    }

    #[tokio::test]
    async fn unparseable_type_is_malformed() {
        let (dispatcher, _) = present_proof_dispatcher();

        let err = dispatcher
            .dispatch(json!({ "@type": "not-a-type", "@id": "1" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CredflowErrorKind::MalformedMessage);
    }

    #[test]
    fn supported_protocols_are_deduplicated() {
        let (mut dispatcher, _) = present_proof_dispatcher();
        dispatcher.register(RecordingHandler::for_types(
            &["https://didcomm.org/present-proof/2.0/propose-presentation"],
            vec![Role::Prover],
        ));
        dispatcher.register(RecordingHandler::for_types(
            &["https://didcomm.org/issue-credential/2.0/offer-credential"],
            vec![Role::Issuer],
        ));

        let protocols = dispatcher.supported_protocols();
        let pids: Vec<String> = protocols.iter().map(|p| p.pid.to_string()).collect();

        assert_eq!(
            pids,
            vec![
                "https://didcomm.org/present-proof/2.0",
                "https://didcomm.org/issue-credential/2.0"
            ]
        );
    }

    #[test]
    fn query_filters_disclosed_protocols() {
        let (mut dispatcher, _) = present_proof_dispatcher();
        dispatcher.register(RecordingHandler::for_types(
            &["https://didcomm.org/issue-credential/2.0/offer-credential"],
            vec![Role::Issuer],
        ));

        let query = Query::builder()
            .id("query-1".to_owned())
            .query("https://didcomm.org/issue-credential/*".to_owned())
            .build();
        let disclose = dispatcher.handle_query(&query);

        assert_eq!(disclose.protocols.len(), 1);
        assert_eq!(
            disclose.protocols[0].pid.to_string(),
            "https://didcomm.org/issue-credential/2.0"
        );
        assert_eq!(disclose.thread.as_ref().unwrap().thid, "query-1");
    }
}
