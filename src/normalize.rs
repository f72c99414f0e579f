use serde_json::{Map, Value};

use crate::conversation::{now_timestamp, DEFAULT_INTENT};

/// Shown when the workflow answered but no reply text could be found
pub const DEFAULT_REPLY: &str = "Sorry, I could not process your request.";

/// Reply fields checked on the first element of an array response, in order
const ARRAY_REPLY_FIELDS: [&str; 4] = ["response", "answer", "content", "text"];

/// Reply fields checked on an object response, in order
const OBJECT_REPLY_FIELDS: [&str; 5] = ["response", "answer", "content", "text", "message"];

/// Display-ready reply extracted from a webhook response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub intent: String,
    pub timestamp: String,
}

/// Extract reply text, intent and timestamp from a loosely-typed response.
///
/// Workflows answer with an object, an array of objects (first one wins) or
/// a bare string. Anything unrecognized falls back to [`DEFAULT_REPLY`]
/// rather than failing.
pub fn normalize_reply(data: &Value) -> Reply {
    let raw = match data {
        Value::Array(items) if !items.is_empty() => items[0]
            .as_object()
            .and_then(|first| first_present(first, &ARRAY_REPLY_FIELDS)),
        Value::Object(fields) => first_present(fields, &OBJECT_REPLY_FIELDS),
        Value::String(text) => Some(text.as_str()),
        _ => None,
    };

    let content = clean_reply_text(raw.unwrap_or(DEFAULT_REPLY));

    let (intent, timestamp) = match data {
        Value::Object(fields) => (
            present_str(fields, "intent").map(str::to_string),
            present_str(fields, "timestamp").map(str::to_string),
        ),
        _ => (None, None),
    };

    Reply {
        content,
        intent: intent.unwrap_or_else(|| DEFAULT_INTENT.to_string()),
        timestamp: timestamp.unwrap_or_else(now_timestamp),
    }
}

/// Strip leading escaped newlines, then leading line breaks, then whitespace.
///
/// Some workflows emit `\n` as two raw characters instead of a line break,
/// so both forms are removed from the start.
pub fn clean_reply_text(raw: &str) -> String {
    let mut text = raw;
    while let Some(rest) = text.strip_prefix("\\n") {
        text = rest;
    }
    text.trim_start_matches(['\n', '\r']).trim().to_string()
}

fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| present_str(fields, key))
}

/// A field counts as present when it holds a non-empty string
fn present_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Format an ISO-8601 timestamp as local `HH:MM`, or an empty string if it doesn't parse
pub fn format_time(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M").to_string())
        .or_else(|_| {
            // Workflows sometimes send naive timestamps without an offset
            chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|t| t.and_utc().with_timezone(&chrono::Local).format("%H:%M").to_string())
        })
        .unwrap_or_default()
}
