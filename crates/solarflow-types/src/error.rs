use thiserror::Error;

use crate::notification::Channel;

/// Errors from record store operations (used by trait definitions in
/// solarflow-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found in '{0}'")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors from notification dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("channel '{0}' is not configured")]
    ChannelDisabled(Channel),

    #[error("send failed on '{channel}': {reason}")]
    SendFailed { channel: Channel, reason: String },

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Errors from registered action handlers.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("action failed: {0}")]
    Failed(String),

    #[error("invalid action input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Errors from alert condition evaluation.
#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("expression parse error: {0}")]
    Parse(String),

    #[error("expression evaluation error: {0}")]
    Evaluation(String),
}
