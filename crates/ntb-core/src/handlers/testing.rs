//! Test doubles shared by the handler tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    config::Config,
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    formatting::ResponseFormatter,
    handlers::Services,
    lookup::{LookupResult, NumberLookup, RetryPolicy},
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, Command, IncomingUpdate, Keyboard, PhotoMessage, TextMessage},
    },
    security::InMemoryRateLimiter,
    store::{DirectBroadcaster, InMemoryUserStore},
    Result,
};

pub const ADMIN: i64 = 1;
pub const USER: i64 = 2;
pub const ATTRIBUTION: &str = "🔧 test attribution";

#[derive(Clone, Debug)]
pub struct Sent {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    answered: Mutex<Vec<String>>,
    failing_chats: Mutex<HashSet<i64>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }

    pub fn fail_for(&self, chat_id: i64) {
        self.failing_chats.lock().unwrap().insert(chat_id);
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        if self.failing_chats.lock().unwrap().contains(&chat_id.0) {
            return Err(Error::Transport("chat not found".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(sent.len() as i32),
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, _text: Option<&str>) -> Result<()> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

pub struct ScriptedLookup {
    result: LookupResult,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLookup {
    pub fn ok(body: &str) -> Self {
        Self::returning(LookupResult::Success(body.to_string()))
    }

    pub fn returning(result: LookupResult) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NumberLookup for ScriptedLookup {
    async fn lookup(&self, number: &str) -> LookupResult {
        self.calls.lock().unwrap().push(number.to_string());
        self.result.clone()
    }
}

pub fn config(extra: &[(&str, &str)]) -> Config {
    Config::from_lookup(|k| match k {
        "BOT_TOKEN" => Some("test-token".into()),
        "ADMIN_ID" => Some(ADMIN.to_string()),
        "BOT_ATTRIBUTION" => Some(ATTRIBUTION.into()),
        _ => extra
            .iter()
            .find(|(key, _)| *key == k)
            .map(|(_, v)| v.to_string()),
    })
    .expect("test config")
}

pub fn services(
    messenger: Arc<RecordingMessenger>,
    lookup: Arc<dyn NumberLookup>,
    vehicle_lookup: Option<Arc<dyn NumberLookup>>,
) -> Arc<Services> {
    services_with(config(&[]), messenger, lookup, vehicle_lookup)
}

pub fn services_with(
    cfg: Config,
    messenger: Arc<RecordingMessenger>,
    lookup: Arc<dyn NumberLookup>,
    vehicle_lookup: Option<Arc<dyn NumberLookup>>,
) -> Arc<Services> {
    let users: Arc<InMemoryUserStore> = Arc::new(InMemoryUserStore::new(cfg.admin_id));
    let broadcaster = Arc::new(DirectBroadcaster::new(users.clone(), messenger.clone()));
    Arc::new(Services {
        messenger,
        lookup,
        vehicle_lookup,
        retry: RetryPolicy {
            max_retries: 0,
            backoff: Duration::from_millis(1),
        },
        limits: Arc::new(InMemoryRateLimiter::new(
            cfg.rate_limit_requests,
            cfg.rate_limit_window,
        )),
        users,
        broadcaster,
        formatter: ResponseFormatter::new(cfg.attribution.clone()),
        started_at: Utc::now(),
        cfg: Arc::new(cfg),
    })
}

pub fn command_from(user: i64, name: &str, args: &str) -> IncomingUpdate {
    IncomingUpdate::Command(Command {
        chat_id: ChatId(user),
        user_id: UserId(user),
        username: Some(format!("user{user}")),
        name: name.to_string(),
        args: args.to_string(),
    })
}

pub fn command(name: &str, args: &str) -> IncomingUpdate {
    command_from(USER, name, args)
}

pub fn text(t: &str) -> IncomingUpdate {
    IncomingUpdate::Text(TextMessage {
        chat_id: ChatId(USER),
        user_id: UserId(USER),
        username: None,
        text: t.to_string(),
    })
}

pub fn callback(data: &str) -> IncomingUpdate {
    IncomingUpdate::Callback(CallbackQuery {
        chat_id: ChatId(USER),
        user_id: UserId(USER),
        username: None,
        callback_id: "cb-1".to_string(),
        data: data.to_string(),
        message: None,
    })
}

pub fn photo() -> IncomingUpdate {
    IncomingUpdate::Photo(PhotoMessage {
        chat_id: ChatId(USER),
        user_id: UserId(USER),
        username: None,
        file_id: "file-1".to_string(),
        caption: None,
    })
}
