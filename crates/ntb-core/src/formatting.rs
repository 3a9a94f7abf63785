//! User-facing text.
//!
//! Failures are always rendered as fixed strings: upstream bodies, status codes
//! and error text never reach the user.

use std::time::Duration;

use crate::{lookup::LookupResult, validation::Verdict};

pub const LOOKUP_APOLOGY: &str = "❌ Sorry, there was an error processing your request.";
pub const PLEASE_WAIT: &str = "⏳ Getting information... Please wait...";
pub const ENTER_NUMBER_PROMPT: &str = "📝 Please enter a 10-digit mobile number:";
pub const WRONG_LENGTH_PROMPT: &str = "❌ Please enter exactly 10 digits!";
pub const USE_MENU_PROMPT: &str = "👋 Please use the 'Enter Number' button to get started!";
pub const ADMIN_ONLY: &str = "⛔ This command is only available to the bot admin.";

/// Telegram's per-message text limit, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const FOUND_HEADER: &str = "📊 Information Found:\n\n";

/// Renders lookup outcomes with a fixed attribution line.
#[derive(Clone, Debug)]
pub struct ResponseFormatter {
    attribution: String,
}

impl ResponseFormatter {
    pub fn new(attribution: impl Into<String>) -> Self {
        Self {
            attribution: attribution.into(),
        }
    }

    pub fn format(&self, result: &LookupResult) -> String {
        match result {
            LookupResult::Success(body) => {
                format!("{FOUND_HEADER}{body}\n\n{}", self.attribution)
            }
            LookupResult::Failure(_) => LOOKUP_APOLOGY.to_string(),
        }
    }

    /// Same text as [`format`](Self::format), split into sendable messages.
    ///
    /// The header opens the first chunk and the attribution closes the last.
    pub fn format_chunks(&self, result: &LookupResult) -> Vec<String> {
        split_chunks(&self.format(result), MAX_MESSAGE_CHARS)
    }

    /// Guidance for a non-`Valid` verdict; `None` means "go ahead and look it up".
    pub fn prompt_for(&self, verdict: &Verdict) -> Option<&'static str> {
        match verdict {
            Verdict::Valid(_) => None,
            Verdict::TooShortOrLong => Some(WRONG_LENGTH_PROMPT),
            Verdict::NotNumeric => Some(USE_MENU_PROMPT),
            Verdict::NotApplicable => Some(ENTER_NUMBER_PROMPT),
        }
    }

    pub fn welcome(&self, first_name: Option<&str>) -> String {
        let greeting = match first_name {
            Some(name) if !name.trim().is_empty() => format!("👋 Hello, {}!", name.trim()),
            _ => "👋 Hello!".to_string(),
        };
        format!(
            "{greeting}\n\n🤖 Welcome to Number Info Bot\n\n\
Send a 10-digit mobile number or pick an option below.\n\n{}",
            self.attribution
        )
    }
}

/// Split on char boundaries, preferring a newline in the back half of each window.
fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if end == rest.len() {
            out.push(rest.to_string());
            break;
        }

        let window = &rest[..end];
        let cut = match window.rfind('\n') {
            Some(nl) if nl >= window.len() / 2 => nl + 1,
            _ => end,
        };
        out.push(rest[..cut].trim_end_matches('\n').to_string());
        rest = &rest[cut..];
    }
    out.retain(|c| !c.is_empty());
    out
}

pub fn help_text() -> String {
    [
        "ℹ️ How to use this bot",
        "",
        "/start - show the menu",
        "/help - show this message",
        "/trace <number> - look up a 10-digit mobile number",
        "/vehicle <registration> - look up a vehicle registration",
        "",
        "You can also just send a 10-digit number.",
    ]
    .join("\n")
}

pub fn rate_limited(retry_after: Duration) -> String {
    let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
    format!("⏳ Too many requests. Please try again in {secs}s.")
}
