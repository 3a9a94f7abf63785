//! Admin-only commands: `/stats`, `/admin`, `/broadcast`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    formatting::ADMIN_ONLY,
    messaging::types::{Command, IncomingUpdate},
    router::Handler,
    Result,
};

use super::{unexpected, Services};

const BROADCAST_USAGE: &str = "📣 Usage: /broadcast <message>";

fn on_off(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

/// Returns the command when the sender is the admin; otherwise replies with a refusal.
async fn admin_command<'a>(
    svc: &Services,
    name: &str,
    update: &'a IncomingUpdate,
) -> Result<Option<&'a Command>> {
    let IncomingUpdate::Command(cmd) = update else {
        return Err(unexpected(name, update));
    };
    if !svc.users.is_admin(cmd.user_id).await {
        tracing::info!(user_id = cmd.user_id.0, command = name, "admin command refused");
        svc.reply(cmd.chat_id, ADMIN_ONLY).await?;
        return Ok(None);
    }
    Ok(Some(cmd))
}

pub struct StatsHandler {
    svc: Arc<Services>,
}

impl StatsHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for StatsHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let Some(cmd) = admin_command(&self.svc, "stats", update).await? else {
            return Ok(());
        };

        let users = self.svc.users.user_count().await;
        let quota = self.svc.limits.status(cmd.user_id).await;
        let text = format!(
            "📈 Bot statistics\n\n👥 Users: {users}\n⏱ Rate limit: {} requests / {}s\n🎫 Your remaining quota: {:.0}",
            quota.max,
            quota.window.as_secs(),
            quota.remaining.floor()
        );
        self.svc.reply(cmd.chat_id, &text).await
    }
}

pub struct AdminHandler {
    svc: Arc<Services>,
}

impl AdminHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for AdminHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let Some(cmd) = admin_command(&self.svc, "admin", update).await? else {
            return Ok(());
        };

        let cfg = &self.svc.cfg;
        let text = [
            "🛠 Admin panel".to_string(),
            String::new(),
            format!(
                "Started: {}",
                self.svc.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            format!("Users: {}", self.svc.users.user_count().await),
            format!("OCR: {}", on_off(cfg.enable_ocr)),
            format!(
                "Image processing: {}",
                on_off(cfg.enable_image_processing)
            ),
            format!(
                "Vehicle lookup: {}",
                on_off(self.svc.vehicle_lookup.is_some())
            ),
            format!("Request timeout: {}s", cfg.request_timeout.as_secs()),
            format!("Max retries: {}", cfg.max_retries),
            String::new(),
            "Commands: /stats, /broadcast <message>".to_string(),
        ]
        .join("\n");

        self.svc.reply(cmd.chat_id, &text).await
    }
}

pub struct BroadcastHandler {
    svc: Arc<Services>,
}

impl BroadcastHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for BroadcastHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let Some(cmd) = admin_command(&self.svc, "broadcast", update).await? else {
            return Ok(());
        };
        let message = cmd.args.trim();
        if message.is_empty() {
            return self.svc.reply(cmd.chat_id, BROADCAST_USAGE).await;
        }

        let report = self.svc.broadcaster.broadcast(message).await?;
        tracing::info!(
            delivered = report.delivered,
            failed = report.failed,
            "broadcast finished"
        );
        let summary = format!(
            "📣 Broadcast sent: {} delivered, {} failed.",
            report.delivered, report.failed
        );
        self.svc.reply(cmd.chat_id, &summary).await
    }
}
