//! Notification dispatch port.

use solarflow_types::error::DispatchError;
use solarflow_types::notification::{Channel, Message, Priority};

/// Outbound notification dispatcher.
///
/// Implementations decide how a (channel, recipient) pair maps onto a real
/// delivery mechanism. A dispatcher call covers exactly one channel; fan-out
/// across a step's channel list is the step runner's job.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait NotificationDispatcher: Send + Sync {
    fn send(
        &self,
        channel: Channel,
        recipient: &str,
        message: &Message,
        priority: Priority,
    ) -> impl std::future::Future<Output = Result<(), DispatchError>> + Send;
}
