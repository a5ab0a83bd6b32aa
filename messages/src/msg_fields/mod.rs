//! Message bodies for the protocols this crate ships. Messages are plain
//! structs: threading and attachments are optional fields, not base-class
//! capabilities, and each struct knows its own message type.

pub mod common;
pub mod cred_issuance;
pub mod discover_features;
pub mod present_proof;

use serde::{de::DeserializeOwned, Serialize};

use crate::{decorators::thread::Thread, msg_types::MessageType};

/// The concrete message classes an exchange thread can persist. Used as
/// part of the storage key alongside the thread id and role.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageClass {
    ProposeCredential,
    OfferCredential,
    RequestCredential,
    IssueCredential,
    ProposePresentation,
    RequestPresentation,
    Presentation,
    PresentationAck,
}

/// Implemented by every protocol message so the exchange coordinators can
/// thread, persist and retrieve them uniformly.
pub trait ExchangeMessage: Serialize + DeserializeOwned {
    const CLASS: MessageClass;

    fn message_type() -> MessageType;

    fn id(&self) -> &str;

    fn thread(&self) -> Option<&Thread>;

    /// The id correlating all messages of one exchange: the thread id when
    /// threaded, the message's own id when it opens the exchange.
    fn exchange_thread_id(&self) -> &str {
        self.thread()
            .map(|thread| thread.thid.as_str())
            .unwrap_or_else(|| self.id())
    }
}
