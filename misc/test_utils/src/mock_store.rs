//! An in-memory exchange message store.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;
use credflow::{
    errors::CredflowResult,
    messages::msg_fields::MessageClass,
    storage::{ExchangeMessageStore, ExchangeRole},
};
use serde_json::Value;

type StoreKey = (String, ExchangeRole, MessageClass);

#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<HashMap<StoreKey, Value>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ExchangeMessageStore for InMemoryMessageStore {
    async fn save_or_update(
        &self,
        thread_id: &str,
        role: ExchangeRole,
        class: MessageClass,
        message: Value,
    ) -> CredflowResult<()> {
        self.messages
            .lock()
            .unwrap()
            .insert((thread_id.to_owned(), role, class), message);
        Ok(())
    }

    async fn find(
        &self,
        thread_id: &str,
        role: ExchangeRole,
        class: MessageClass,
    ) -> CredflowResult<Option<Value>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&(thread_id.to_owned(), role, class))
            .cloned())
    }
}
