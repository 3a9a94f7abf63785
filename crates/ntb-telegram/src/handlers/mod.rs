//! Telegram update endpoints.
//!
//! Each endpoint converts the raw update into a core `IncomingUpdate` and hands
//! it to the shared `Router`. Business logic lives in `ntb-core`.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use ntb_core::router::{DispatchOutcome, Router};

use crate::convert;

pub async fn handle_message(msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    let Some(update) = convert::from_message(&msg) else {
        tracing::debug!(chat_id = msg.chat.id.0, "unsupported message skipped");
        return Ok(());
    };
    log_outcome(router.dispatch(update).await);
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, router: Arc<Router>) -> ResponseResult<()> {
    log_outcome(router.dispatch(convert::from_callback(&q)).await);
    Ok(())
}

fn log_outcome(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Handled(key) => tracing::debug!(key = %key, "update handled"),
        DispatchOutcome::Failed(key) => tracing::debug!(key = %key, "update handler failed"),
        DispatchOutcome::Ignored => {}
    }
}
