//! Persistence of exchange messages. Coordinators store every message
//! they send or receive, keyed by exchange thread, so later protocol steps
//! can retrieve what was previously negotiated.

use std::fmt::Debug;

use async_trait::async_trait;
use credflow_messages::msg_fields::{ExchangeMessage, MessageClass};
use serde_json::Value;

use crate::errors::{CredflowError, CredflowErrorKind, CredflowResult};

/// Whether the stored message was authored locally or received from the
/// other agent. The same message class can exist under both roles within
/// one thread (e.g. a proposal sent, then a counter-proposal received).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeRole {
    Sender,
    Receiver,
}

#[async_trait]
pub trait ExchangeMessageStore: Debug + Send + Sync {
    /// Stores the message, replacing any previous message under the same
    /// (thread, role, class) key.
    async fn save_or_update(
        &self,
        thread_id: &str,
        role: ExchangeRole,
        class: MessageClass,
        message: Value,
    ) -> CredflowResult<()>;

    async fn find(
        &self,
        thread_id: &str,
        role: ExchangeRole,
        class: MessageClass,
    ) -> CredflowResult<Option<Value>>;
}

/// Typed convenience layer over the raw JSON store.
#[async_trait]
pub trait ExchangeMessageStoreExt: ExchangeMessageStore {
    async fn save_message<M>(
        &self,
        thread_id: &str,
        role: ExchangeRole,
        message: &M,
    ) -> CredflowResult<()>
    where
        M: ExchangeMessage + Send + Sync,
    {
        self.save_or_update(thread_id, role, M::CLASS, serde_json::to_value(message)?)
            .await
    }

    async fn find_message<M>(
        &self,
        thread_id: &str,
        role: ExchangeRole,
    ) -> CredflowResult<Option<M>>
    where
        M: ExchangeMessage + Send,
    {
        match self.find(thread_id, role, M::CLASS).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Like [`ExchangeMessageStoreExt::find_message`] but the message must
    /// exist: protocol steps that respond to a prior message fail when the
    /// thread has no such message.
    async fn get_message<M>(&self, thread_id: &str, role: ExchangeRole) -> CredflowResult<M>
    where
        M: ExchangeMessage + Send,
    {
        self.find_message(thread_id, role).await?.ok_or_else(|| {
            CredflowError::from_msg(
                CredflowErrorKind::PriorMessageNotFound,
                format!("No {:?} message stored for thread {thread_id}", M::CLASS),
            )
        })
    }
}

impl<T: ExchangeMessageStore + ?Sized> ExchangeMessageStoreExt for T {}
