use crate::domain::{ChatId, MessageRef, UserId};

/// Transport-agnostic incoming update.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
    Callback(CallbackQuery),
    Photo(PhotoMessage),
}

impl IncomingUpdate {
    pub fn chat_id(&self) -> ChatId {
        match self {
            IncomingUpdate::Command(c) => c.chat_id,
            IncomingUpdate::Text(t) => t.chat_id,
            IncomingUpdate::Callback(q) => q.chat_id,
            IncomingUpdate::Photo(p) => p.chat_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            IncomingUpdate::Command(c) => c.user_id,
            IncomingUpdate::Text(t) => t.user_id,
            IncomingUpdate::Callback(q) => q.user_id,
            IncomingUpdate::Photo(p) => p.user_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub name: String,
    pub args: String,
}

impl Command {
    /// Split `/name@bot args...` into `(name, args)`.
    ///
    /// The name keeps its case: command matching is exact. Returns `None` when
    /// the text is not a command.
    pub fn split(text: &str) -> Option<(String, String)> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let mut parts = rest.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim().to_string();

        let name = first.split('@').next().unwrap_or("");
        if name.is_empty() {
            return None;
        }
        Some((name.to_string(), args))
    }
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct PhotoMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub file_id: String,
    pub caption: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub callback_id: String,
    pub data: String,
    pub message: Option<MessageRef>,
}

/// Update categories a transport can be asked to deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateCategory {
    Message,
    CallbackQuery,
}

/// The reply-keyboard menu shown by `/start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuOption {
    EnterNumber,
    TraceNumber,
    VehicleInfo,
    Help,
}

impl MenuOption {
    pub const ALL: [MenuOption; 4] = [
        MenuOption::EnterNumber,
        MenuOption::TraceNumber,
        MenuOption::VehicleInfo,
        MenuOption::Help,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuOption::EnterNumber => "🔢 Enter Number",
            MenuOption::TraceNumber => "📱 Trace Number",
            MenuOption::VehicleInfo => "🚗 Vehicle Info",
            MenuOption::Help => "❓ Help",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|o| o.label() == text)
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent reply keyboard, labels laid out two per row.
    Menu(Vec<MenuOption>),
    /// Inline buttons under the message, one per row.
    Inline(Vec<InlineButton>),
}

impl Keyboard {
    pub fn main_menu() -> Self {
        Keyboard::Menu(MenuOption::ALL.to_vec())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_split_strips_bot_suffix_and_keeps_case() {
        assert_eq!(
            Command::split("/trace@numbot 9876543210"),
            Some(("trace".to_string(), "9876543210".to_string()))
        );
        assert_eq!(
            Command::split("/Start"),
            Some(("Start".to_string(), String::new()))
        );
        assert_eq!(
            Command::split("/broadcast  hello   world "),
            Some(("broadcast".to_string(), "hello   world".to_string()))
        );
        assert_eq!(Command::split("hello"), None);
        assert_eq!(Command::split("/"), None);
        assert_eq!(Command::split("/@bot"), None);
    }

    #[test]
    fn menu_labels_round_trip() {
        for opt in MenuOption::ALL {
            assert_eq!(MenuOption::from_label(opt.label()), Some(opt));
        }
        assert_eq!(MenuOption::from_label("Enter Number"), None);
    }
}
