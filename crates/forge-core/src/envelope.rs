//! Response envelope extraction
//!
//! The generation backend answers with free text: a short description and
//! a JSON blueprint, normally inside a ```` ```json ```` fence. This module
//! pulls both out and applies the usual cleanups for model output (line and
//! block comments, trailing commas).

use crate::error::GenerationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Description used when the response carries none
pub const DEFAULT_DESCRIPTION: &str = "Untitled AI structure";

/// Longest description kept, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 80;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.+?)\s*```").expect("static pattern"));
static BARE_STRUCTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)\{\s*"structure"\s*:\s*\{.*\}\s*\}"#).expect("static pattern"));
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*//.*$").expect("static pattern"));
static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static pattern"));
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("static pattern"));
static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^[*\->\s!"'#]*(description|title|summary|name)\s*:?\s*"#).expect("static pattern")
});

/// Description plus raw blueprint document
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Short human-readable description
    pub description: String,
    /// Parsed JSON document, not yet validated
    pub document: Value,
}

/// Split a backend response into description and JSON document
///
/// # Errors
/// [`GenerationError::MalformedEnvelope`] if no JSON block is found or it
/// does not parse after cleanup.
pub fn extract(text: &str) -> Result<Envelope, GenerationError> {
    let (json_start, json_end, raw_json) = if let Some(caps) = FENCED_JSON.captures(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let body = caps.get(1).map_or("", |m| m.as_str());
        (whole.start, whole.end, body)
    } else if let Some(m) = BARE_STRUCTURE.find(text) {
        tracing::warn!("no fenced json block in response, using bare structure object");
        (m.start(), m.end(), m.as_str())
    } else {
        return Err(GenerationError::MalformedEnvelope(
            "response contains no json block".to_string(),
        ));
    };

    let cleaned = clean_json(raw_json);
    let document: Value = serde_json::from_str(&cleaned)
        .map_err(|e| GenerationError::MalformedEnvelope(format!("json parse error: {e}")))?;

    let description = describe(&text[..json_start], &text[json_end..]);
    tracing::debug!(%description, "extracted response envelope");

    Ok(Envelope { description, document })
}

/// Remove comments and trailing commas that models like to emit
#[must_use]
pub fn clean_json(raw: &str) -> String {
    let text = LINE_COMMENT.replace_all(raw, "");
    let text = BLOCK_COMMENT.replace_all(&text, "");
    TRAILING_COMMA.replace_all(&text, "$1").into_owned()
}

fn describe(before: &str, after: &str) -> String {
    let candidate = before
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .or_else(|| after.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or_default();

    let stripped = LABEL_PREFIX.replace(candidate, "");
    let mut description = stripped.trim();
    if let Some(inner) = description.strip_prefix('(') {
        description = inner;
    }
    if let Some(inner) = description.strip_suffix(')') {
        description = inner;
    }
    let description = description.trim();

    if description.is_empty() {
        return DEFAULT_DESCRIPTION.to_string();
    }
    truncate(description)
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
    short.push_str("...");
    short
}
