//! Bot handlers.
//!
//! Each handler is a small value bound to one dispatch key. They talk to the
//! chat platform only through `MessagingPort`, so tests can swap in doubles.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    config::Config,
    domain::ChatId,
    errors::Error,
    formatting::ResponseFormatter,
    lookup::{NumberLookup, RetryPolicy},
    messaging::{
        port::MessagingPort,
        types::{IncomingUpdate, Keyboard},
    },
    ports::{Broadcaster, RateLimitStore, UserStore},
    router::{DispatchKey, HandlerTable},
    Result,
};

mod admin;
mod callback;
mod commands;
mod photo;
mod text;
mod trace;

#[cfg(test)]
mod testing;

pub use admin::{AdminHandler, BroadcastHandler, StatsHandler};
pub use callback::CallbackHandler;
pub use commands::{HelpHandler, StartHandler};
pub use photo::PhotoHandler;
pub use text::TextHandler;
pub use trace::{TraceHandler, VehicleHandler};

/// The fixed command set, in registration order.
pub const COMMANDS: [&str; 7] = [
    "start",
    "help",
    "trace",
    "vehicle",
    "stats",
    "admin",
    "broadcast",
];

/// Everything a handler may need. Read-only after setup.
pub struct Services {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub lookup: Arc<dyn NumberLookup>,
    pub vehicle_lookup: Option<Arc<dyn NumberLookup>>,
    pub retry: RetryPolicy,
    pub users: Arc<dyn UserStore>,
    pub limits: Arc<dyn RateLimitStore>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub formatter: ResponseFormatter,
    pub started_at: DateTime<Utc>,
}

impl Services {
    pub(crate) async fn reply(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.messenger.send_message(chat_id, text, None).await?;
        Ok(())
    }

    pub(crate) async fn reply_with(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<()> {
        self.messenger
            .send_message(chat_id, text, Some(keyboard))
            .await?;
        Ok(())
    }
}

/// Populate `table` with the full handler set.
pub fn register_all(table: &mut HandlerTable, svc: Arc<Services>) -> Result<()> {
    table.register(
        DispatchKey::command("start"),
        Arc::new(StartHandler::new(svc.clone())),
    )?;
    table.register(
        DispatchKey::command("help"),
        Arc::new(HelpHandler::new(svc.clone())),
    )?;
    table.register(
        DispatchKey::command("trace"),
        Arc::new(TraceHandler::new(svc.clone())),
    )?;
    table.register(
        DispatchKey::command("vehicle"),
        Arc::new(VehicleHandler::new(svc.clone())),
    )?;
    table.register(
        DispatchKey::command("stats"),
        Arc::new(StatsHandler::new(svc.clone())),
    )?;
    table.register(
        DispatchKey::command("admin"),
        Arc::new(AdminHandler::new(svc.clone())),
    )?;
    table.register(
        DispatchKey::command("broadcast"),
        Arc::new(BroadcastHandler::new(svc.clone())),
    )?;

    table.register(DispatchKey::Callback, Arc::new(CallbackHandler::new(svc.clone())))?;
    table.register(DispatchKey::Photo, Arc::new(PhotoHandler::new(svc.clone())))?;
    table.register(DispatchKey::Text, Arc::new(TextHandler::new(svc)))?;
    Ok(())
}

fn unexpected(handler: &str, update: &IncomingUpdate) -> Error {
    Error::Handler(format!(
        "{handler} handler received {}",
        DispatchKey::for_update(update)
    ))
}
