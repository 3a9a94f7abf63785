use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    formatting::{help_text, ENTER_NUMBER_PROMPT},
    messaging::types::IncomingUpdate,
    router::Handler,
    Result,
};

use super::{trace::VEHICLE_PROMPT, unexpected, Services};

/// Inline button presses. The payload is interpreted here, not by the router.
pub struct CallbackHandler {
    svc: Arc<Services>,
}

impl CallbackHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for CallbackHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let IncomingUpdate::Callback(q) = update else {
            return Err(unexpected("callback", update));
        };

        // Always answer so the client stops showing a spinner.
        if let Err(e) = self
            .svc
            .messenger
            .answer_callback_query(&q.callback_id, None)
            .await
        {
            tracing::warn!(error = %e, "failed to answer callback query");
        }

        match q.data.as_str() {
            "trace" | "enter_number" => self.svc.reply(q.chat_id, ENTER_NUMBER_PROMPT).await,
            "vehicle" => self.svc.reply(q.chat_id, VEHICLE_PROMPT).await,
            "help" => self.svc.reply(q.chat_id, &help_text()).await,
            other => {
                tracing::debug!(data = other, "unknown callback payload");
                Ok(())
            }
        }
    }
}
