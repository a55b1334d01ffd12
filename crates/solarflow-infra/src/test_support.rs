//! Shared test doubles for infra modules.

use std::sync::Mutex;

use solarflow_core::notify::NotificationDispatcher;
use solarflow_types::error::DispatchError;
use solarflow_types::notification::{Channel, Message, Priority};

#[derive(Debug, Clone)]
pub(crate) struct SentMessage {
    pub channel: Channel,
    pub recipient: String,
    pub message: Message,
    pub priority: Priority,
}

/// Dispatcher that records every send and always succeeds.
#[derive(Debug, Default)]
pub(crate) struct RecordingDispatcher {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        message: &Message,
        priority: Priority,
    ) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(SentMessage {
            channel,
            recipient: recipient.to_string(),
            message: message.clone(),
            priority,
        });
        Ok(())
    }
}
