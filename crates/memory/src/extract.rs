//! Keyword and pattern extraction of interaction facts from free text.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use salesdesk_core::CustomerId;

use crate::types::{InteractionType, NewInteraction, Outcome};

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:€\s*(?P<pre>\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?))|(?:(?P<post>\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?)\s*(?:€|eur\b|euro\b))",
    )
    .expect("valid amount regex")
});

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+){1,2}\b").expect("valid name regex"));

static IN_DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:tra|fra)\s+(\d{1,3})\s+giorni\b").expect("valid follow-up regex"));

/// Capitalized words that start sentences rather than names.
const NOT_NAMES: &[&str] = &[
    "Ho", "Oggi", "Ieri", "Domani", "Abbiamo", "Sono", "Il", "La", "Lo", "Le", "Gli", "Con", "Da", "Per", "Dopo",
    "Stamattina", "Stasera", "Poi", "Anche", "Chiamato", "Sentito", "Visto", "Incontrato",
];

const TYPE_KEYWORDS: &[(InteractionType, &[&str])] = &[
    (InteractionType::Call, &["chiamat", "telefonat", "sentito al telefono"]),
    (InteractionType::Email, &["email", "e-mail", "mail"]),
    (InteractionType::Meeting, &["incontr", "meeting", "visita", "visitato", "riunione"]),
    (InteractionType::Order, &["ordinat", "comprat", "ordine", "acquistat"]),
];

const NEGATIVE: &[&str] = &[
    " male", "non interessat", "non è interessat", "rifiut", "problem", "annullat", "lamentat", "negativ",
    "ha perso", "non vuole",
];

const POSITIVE: &[&str] = &[
    "bene", "ottim", "interessat", "positiv", "content", "soddisfatt", "chiuso", "firmat", "confermat",
];

/// Facts recognised in a salesperson's message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInteraction {
    pub interaction_type: Option<InteractionType>,
    pub client_name: Option<String>,
    pub amount: Option<f64>,
    pub outcome: Option<Outcome>,
    /// Days until the follow-up mentioned in the text.
    pub follow_up_in_days: Option<i64>,
    pub summary: String,
}

impl ExtractedInteraction {
    /// Turn the extraction into a storable interaction. Unknown types become notes;
    /// a follow-up hint becomes a dated next action.
    pub fn into_new_interaction(self, customer_id: Option<CustomerId>, today: NaiveDate) -> NewInteraction {
        let mut new = NewInteraction::new(self.interaction_type.unwrap_or(InteractionType::Note), self.summary)
            .with_customer(customer_id, self.client_name);
        new.outcome = self.outcome;
        new.amount = self.amount;
        if let Some(days) = self.follow_up_in_days {
            new = new.with_next_action("Ricontattare", today + Duration::days(days));
        }
        new
    }
}

/// Extract interaction facts, or `None` when the text mentions no interaction
/// type, amount or client name.
pub fn extract_interaction_from_message(text: &str) -> Option<ExtractedInteraction> {
    let lower = text.to_lowercase();

    let interaction_type = detect_type(&lower);
    let amount = parse_amount(text);
    let client_name = detect_client_name(text);

    if interaction_type.is_none() && amount.is_none() && client_name.is_none() {
        return None;
    }

    Some(ExtractedInteraction {
        interaction_type,
        client_name,
        amount,
        outcome: detect_outcome(&lower),
        follow_up_in_days: detect_follow_up(&lower),
        summary: text.trim().to_string(),
    })
}

fn detect_type(lower: &str) -> Option<InteractionType> {
    TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(kind, _)| *kind)
}

/// Negative phrases are checked first so that "non interessato" is not read as positive.
fn detect_outcome(lower: &str) -> Option<Outcome> {
    if NEGATIVE.iter().any(|k| lower.contains(k)) {
        Some(Outcome::Negative)
    } else if POSITIVE.iter().any(|k| lower.contains(k)) {
        Some(Outcome::Positive)
    } else {
        None
    }
}

/// First amount in the text, Italian notation: `.` groups thousands, `,` marks decimals.
pub fn parse_amount(text: &str) -> Option<f64> {
    let caps = AMOUNT_RE.captures(text)?;
    let raw = caps.name("pre").or_else(|| caps.name("post"))?.as_str();
    raw.replace('.', "").replace(',', ".").parse().ok()
}

/// First run of 2-3 capitalized words not opened by a sentence word.
fn detect_client_name(text: &str) -> Option<String> {
    let mut rest = text;
    while let Some(m) = NAME_RE.find(rest) {
        let words: Vec<&str> = m.as_str().split_whitespace().collect();
        match words.first() {
            Some(first) if NOT_NAMES.contains(first) => rest = &rest[m.start() + first.len()..],
            _ => return Some(words.join(" ")),
        }
    }
    None
}

fn detect_follow_up(lower: &str) -> Option<i64> {
    if lower.contains("dopodomani") {
        return Some(2);
    }
    if lower.contains("domani") {
        return Some(1);
    }
    if lower.contains("settimana prossima") || lower.contains("prossima settimana") {
        return Some(7);
    }
    IN_DAYS_RE
        .captures(lower)
        .and_then(|c| c.get(1))
        .and_then(|d| d.as_str().parse().ok())
}
