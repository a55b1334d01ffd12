//! Channel notifier implementing the dispatch port.
//!
//! Routes each send to a per-channel sender based on `NotifierSettings`:
//! email and SMS go through the tracing log sender (the console transport
//! of this revision), WhatsApp goes through an HTTP gateway when a URL is
//! configured. SMS is reserved for urgent-priority messages.

use serde_json::{Value, json};
use solarflow_core::notify::NotificationDispatcher;
use solarflow_types::config::NotifierSettings;
use solarflow_types::error::DispatchError;
use solarflow_types::notification::{Channel, Message, Priority};

pub struct ChannelNotifier {
    settings: NotifierSettings,
    http: reqwest::Client,
}

impl ChannelNotifier {
    pub fn new(settings: NotifierSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    fn send_email(
        &self,
        recipient: &str,
        message: &Message,
        priority: Priority,
    ) -> Result<(), DispatchError> {
        if !self.settings.email_enabled {
            return Err(DispatchError::ChannelDisabled(Channel::Email));
        }
        if !recipient.contains('@') {
            return Err(DispatchError::InvalidRecipient(recipient.to_string()));
        }
        tracing::info!(
            recipient,
            subject = %message.subject,
            %priority,
            "email notification sent"
        );
        Ok(())
    }

    async fn send_whatsapp(
        &self,
        recipient: &str,
        message: &Message,
        priority: Priority,
    ) -> Result<(), DispatchError> {
        if !self.settings.whatsapp_enabled {
            return Err(DispatchError::ChannelDisabled(Channel::Whatsapp));
        }
        let url = match &self.settings.whatsapp_api_url {
            Some(url) => url,
            None => return Err(DispatchError::ChannelDisabled(Channel::Whatsapp)),
        };

        let payload = webhook_payload(recipient, message, priority);
        let mut request = self.http.post(url).json(&payload);
        if let Some(key) = &self.settings.whatsapp_api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| DispatchError::SendFailed {
            channel: Channel::Whatsapp,
            reason: err.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(DispatchError::SendFailed {
                channel: Channel::Whatsapp,
                reason: format!("gateway returned {}", response.status()),
            });
        }
        tracing::info!(recipient, "whatsapp notification delivered");
        Ok(())
    }

    fn send_sms(
        &self,
        recipient: &str,
        message: &Message,
        priority: Priority,
    ) -> Result<(), DispatchError> {
        if !self.settings.sms_enabled {
            return Err(DispatchError::ChannelDisabled(Channel::Sms));
        }
        if priority != Priority::Urgent {
            return Err(DispatchError::SendFailed {
                channel: Channel::Sms,
                reason: "sms delivery is reserved for urgent priority".to_string(),
            });
        }
        tracing::info!(recipient, body = %message.body, "sms notification sent");
        Ok(())
    }
}

/// Body posted to the WhatsApp-style HTTP gateway.
fn webhook_payload(recipient: &str, message: &Message, priority: Priority) -> Value {
    json!({
        "to": recipient,
        "subject": message.subject,
        "message": message.body,
        "priority": priority.to_string(),
    })
}

impl NotificationDispatcher for ChannelNotifier {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        message: &Message,
        priority: Priority,
    ) -> Result<(), DispatchError> {
        if recipient.trim().is_empty() {
            return Err(DispatchError::InvalidRecipient(recipient.to_string()));
        }
        match channel {
            Channel::Email => self.send_email(recipient, message, priority),
            Channel::Whatsapp => self.send_whatsapp(recipient, message, priority).await,
            Channel::Sms => self.send_sms(recipient, message, priority),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
