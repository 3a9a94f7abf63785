use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{Keyboard, UpdateCategory},
    router::Router,
    Result,
};

/// Outbound side of a chat platform.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send plain text (no markup parsing), optionally with a keyboard.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Receive-loop settings handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingOptions {
    pub allowed_updates: Vec<UpdateCategory>,
    /// Discard updates queued while the process was offline.
    pub drop_pending_updates: bool,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            allowed_updates: vec![UpdateCategory::Message, UpdateCategory::CallbackQuery],
            drop_pending_updates: true,
        }
    }
}

/// Inbound side of a chat platform, driven by the lifecycle manager.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// Remove any push (webhook) subscription so long polling can be used.
    async fn clear_webhook(&self) -> Result<()>;

    /// Run the receive loop, feeding every update into `router`, until
    /// `shutdown` is cancelled or the loop fails.
    async fn run_polling(
        &self,
        router: Arc<Router>,
        opts: PollingOptions,
        shutdown: CancellationToken,
    ) -> Result<()>;

    /// Drop the transport's client handle. Later calls fail with `Error::Transport`.
    /// Called once during shutdown; a second call is a no-op.
    async fn close(&self) -> Result<()>;
}
