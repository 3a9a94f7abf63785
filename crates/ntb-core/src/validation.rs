//! Input classification for the number lookup workflow.

use std::sync::OnceLock;

use regex::Regex;

use crate::messaging::types::MenuOption;

pub const PHONE_DIGITS: usize = 10;

/// Outcome of classifying a user's text against the expected phone-number shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Exactly ten decimal digits (after trimming).
    Valid(String),
    /// Only digits, but not ten of them.
    TooShortOrLong,
    /// Contains something other than a digit.
    NotNumeric,
    /// Not a lookup attempt at all: a menu label, or nothing to classify.
    NotApplicable,
}

/// Classify raw user text. Pure and total.
pub fn classify(text: &str) -> Verdict {
    let trimmed = text.trim();
    if trimmed.is_empty() || MenuOption::from_label(trimmed).is_some() {
        return Verdict::NotApplicable;
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Verdict::NotNumeric;
    }
    if trimmed.len() != PHONE_DIGITS {
        return Verdict::TooShortOrLong;
    }
    Verdict::Valid(trimmed.to_string())
}

/// Normalise a vehicle registration (`mh 12-ab 1234` -> `MH12AB1234`) and check its shape.
pub fn normalize_registration(text: &str) -> Option<String> {
    static PLATE: OnceLock<Regex> = OnceLock::new();
    let plate = PLATE.get_or_init(|| {
        Regex::new(r"^[A-Z]{2}[0-9]{1,2}[A-Z]{0,3}[0-9]{4}$").expect("static registration regex")
    });

    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    plate.is_match(&normalized).then_some(normalized)
}
