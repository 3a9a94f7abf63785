use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    formatting::help_text,
    messaging::types::{IncomingUpdate, InlineButton, Keyboard},
    router::Handler,
    Result,
};

use super::{unexpected, Services};

pub(crate) fn help_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        InlineButton::new("📱 Trace Number", "trace"),
        InlineButton::new("🚗 Vehicle Info", "vehicle"),
    ])
}

/// `/start`: remember the user and show the menu.
pub struct StartHandler {
    svc: Arc<Services>,
}

impl StartHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for StartHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let IncomingUpdate::Command(cmd) = update else {
            return Err(unexpected("start", update));
        };

        if let Err(e) = self
            .svc
            .users
            .record_user(cmd.user_id, cmd.username.as_deref())
            .await
        {
            tracing::warn!(user_id = cmd.user_id.0, error = %e, "failed to record user");
        }

        let welcome = self.svc.formatter.welcome(cmd.username.as_deref());
        self.svc
            .reply_with(cmd.chat_id, &welcome, Keyboard::main_menu())
            .await
    }
}

pub struct HelpHandler {
    svc: Arc<Services>,
}

impl HelpHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for HelpHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let IncomingUpdate::Command(cmd) = update else {
            return Err(unexpected("help", update));
        };
        self.svc
            .reply_with(cmd.chat_id, &help_text(), help_keyboard())
            .await
    }
}
