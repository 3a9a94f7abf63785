//! Telegram adapter (teloxide).
//!
//! Implements the `ntb-core` messaging ports over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup},
};

use tokio::time::sleep;

pub mod convert;
pub mod handlers;
pub mod transport;

pub use transport::TelegramTransport;

use ntb_core::{
    config::Config,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::Keyboard},
    Result,
};

/// Build a `Bot` for the configured token, honouring a custom API URL.
pub fn bot_from_config(cfg: &Config) -> Result<Bot> {
    let bot = Bot::new(cfg.bot_token.clone());
    match &cfg.telegram_api_url {
        Some(raw) => {
            let url = reqwest::Url::parse(raw)
                .map_err(|e| Error::Config(format!("invalid TELEGRAM_API_URL: {e}")))?;
            Ok(bot.set_api_url(url))
        }
        None => Ok(bot),
    }
}

pub(crate) fn map_err(e: teloxide::RequestError) -> Error {
    Error::Transport(format!("telegram error: {e}"))
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn markup(keyboard: Keyboard) -> teloxide::types::ReplyMarkup {
        match keyboard {
            Keyboard::Menu(options) => {
                let rows: Vec<Vec<KeyboardButton>> = options
                    .chunks(2)
                    .map(|row| row.iter().map(|o| KeyboardButton::new(o.label())).collect())
                    .collect();
                KeyboardMarkup::new(rows).resize_keyboard(true).into()
            }
            Keyboard::Inline(buttons) => {
                let rows: Vec<Vec<InlineKeyboardButton>> = buttons
                    .into_iter()
                    .map(|b| vec![InlineKeyboardButton::callback(b.label, b.callback_data)])
                    .collect();
                InlineKeyboardMarkup::new(rows).into()
            }
        }
    }
}

/// Flood-control waits honoured before giving up on a request.
const FLOOD_WAITS: u32 = 1;

/// Run a Bot API request, sleeping through `RetryAfter` up to [`FLOOD_WAITS`] times.
async fn with_flood_wait<T, R>(mut request: impl FnMut() -> R) -> Result<T>
where
    R: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
    R::IntoFuture: Send,
{
    let mut waited = 0;
    loop {
        let err = match request().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let teloxide::RequestError::RetryAfter(wait) = err else {
            return Err(map_err(err));
        };
        if waited == FLOOD_WAITS {
            return Err(map_err(teloxide::RequestError::RetryAfter(wait)));
        }
        waited += 1;
        tracing::debug!(wait_secs = wait.as_secs(), "flood control, waiting");
        sleep(wait).await;
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        let markup = keyboard.map(Self::markup);
        let msg = with_flood_wait(|| {
            let req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
            match &markup {
                Some(m) => req.reply_markup(m.clone()),
                None => req,
            }
        })
        .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        with_flood_wait(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}
