//! Telegram `Message` / `CallbackQuery` to core `IncomingUpdate`.

use teloxide::types::{CallbackQuery as TgCallback, Message};

use ntb_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::{CallbackQuery, Command, IncomingUpdate, PhotoMessage, TextMessage},
};

/// Fields of an inbound message the bot cares about.
#[derive(Clone, Debug, Default)]
pub struct MessageParts<'a> {
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<&'a str>,
    pub text: Option<&'a str>,
    pub photo_file_id: Option<&'a str>,
    pub caption: Option<&'a str>,
}

/// Returns `None` for messages without a sender or with content the bot does not handle.
pub fn from_parts(parts: MessageParts<'_>) -> Option<IncomingUpdate> {
    let user_id = UserId(parts.user_id?);
    let chat_id = ChatId(parts.chat_id);
    let username = parts.username.map(str::to_string);

    if let Some(file_id) = parts.photo_file_id {
        return Some(IncomingUpdate::Photo(PhotoMessage {
            chat_id,
            user_id,
            username,
            file_id: file_id.to_string(),
            caption: parts.caption.map(str::to_string),
        }));
    }

    let text = parts.text?;
    if let Some((name, args)) = Command::split(text) {
        return Some(IncomingUpdate::Command(Command {
            chat_id,
            user_id,
            username,
            name,
            args,
        }));
    }

    Some(IncomingUpdate::Text(TextMessage {
        chat_id,
        user_id,
        username,
        text: text.to_string(),
    }))
}

pub fn from_message(msg: &Message) -> Option<IncomingUpdate> {
    let from = msg.from();
    // Telegram orders photo sizes ascending; take the largest.
    let photo_file_id = msg
        .photo()
        .and_then(|sizes| sizes.last())
        .map(|p| p.file.id.as_str());

    from_parts(MessageParts {
        chat_id: msg.chat.id.0,
        user_id: from.map(|u| u.id.0 as i64),
        username: from.and_then(|u| u.username.as_deref()),
        text: msg.text(),
        photo_file_id,
        caption: msg.caption(),
    })
}

/// Callback queries from inline keyboards. The chat falls back to the
/// sender's private chat when the originating message is unavailable.
pub fn from_callback(q: &TgCallback) -> IncomingUpdate {
    let user_id = UserId(q.from.id.0 as i64);
    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });
    let chat_id = message.map(|m| m.chat_id).unwrap_or(ChatId(user_id.0));

    IncomingUpdate::Callback(CallbackQuery {
        chat_id,
        user_id,
        username: q.from.username.clone(),
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        message,
    })
}
