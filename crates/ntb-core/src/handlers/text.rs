use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    formatting::help_text,
    messaging::types::{IncomingUpdate, MenuOption},
    router::Handler,
    Result,
};

use super::{
    commands::help_keyboard,
    trace::{number_lookup, VEHICLE_PROMPT},
    unexpected, Services,
};

/// Plain text: menu labels, or a number to look up.
pub struct TextHandler {
    svc: Arc<Services>,
}

impl TextHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for TextHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let IncomingUpdate::Text(msg) = update else {
            return Err(unexpected("text", update));
        };

        match MenuOption::from_label(&msg.text) {
            Some(MenuOption::Help) => {
                self.svc
                    .reply_with(msg.chat_id, &help_text(), help_keyboard())
                    .await
            }
            Some(MenuOption::VehicleInfo) => self.svc.reply(msg.chat_id, VEHICLE_PROMPT).await,
            // Number entry labels fall through to the classifier's "enter a number" prompt.
            _ => number_lookup(&self.svc, msg.chat_id, msg.user_id, &msg.text).await,
        }
    }
}
