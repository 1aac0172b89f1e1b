//! Classified engine failures.

use thiserror::Error;

/// Failures the engine reports to the user with a specific reply.
///
/// Anything else (storage or transport errors) is reported generically.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("forwarded message carries no source chat")]
    MissingSourceChat,

    #[error("list {0} not found")]
    ListNotFound(i64),

    #[error("storage channel is not configured")]
    StorageNotConfigured,

    #[error("failed to store message in the storage channel: {0}")]
    StorageWrite(String),
}

impl FlowError {
    /// Reply shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingSourceChat => {
                "⚠️ Flow error: I can't see which channel this message came from. \
                 Forward a post directly from the channel."
            }
            Self::ListNotFound(_) => {
                "⚠️ Flow error: something went wrong with this operation. Use /cancel and start again."
            }
            Self::StorageNotConfigured => {
                "⚠️ Configuration error: the storage channel is not set up. Contact the bot administrator."
            }
            Self::StorageWrite(_) => {
                "⚠️ I couldn't store your message. Please try again."
            }
        }
    }
}
