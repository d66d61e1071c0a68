//! Mapping of provider-native message records onto the canonical shapes
//!
//! Each target field is resolved by trying a list of known source keys
//! in order. Nothing here fails: an unresolvable field degrades to its
//! placeholder, empty string, or `None`.

use crate::model::{MessageDetail, MessageSummary, NO_SUBJECT};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

const ID_KEYS: &[&str] = &["id", "mail_id", "email_id"];
const SUBJECT_KEYS: &[&str] = &["subject", "mail_subject"];
const DATE_KEYS: &[&str] =
    &["date", "createdAt", "receivedAt", "mail_timestamp", "mail_date"];
const PREVIEW_KEYS: &[&str] = &["intro", "mail_excerpt", "preview", "snippet"];
const TEXT_KEYS: &[&str] = &["textBody", "text", "body_text"];
const HTML_KEYS: &[&str] = &["htmlBody", "html", "mail_body", "body"];

/// Preview length when it has to be cut from the body.
const PREVIEW_CHARS: usize = 100;

/// Normalize a provider-native record into its list-view shape.
#[must_use]
pub fn summarize(record: &Value) -> MessageSummary {
    MessageSummary {
        id: resolve_id(record).unwrap_or_default(),
        from: resolve_from(record),
        subject: resolve_subject(record),
        received_at: resolve_date(record),
        preview: resolve_preview(record),
    }
}

/// Normalize a provider-native record into its single-message shape.
#[must_use]
pub fn detail(record: &Value) -> MessageDetail {
    MessageDetail {
        id: resolve_id(record).unwrap_or_default(),
        from: resolve_from(record),
        subject: resolve_subject(record),
        received_at: resolve_date(record),
        body_text: first_text(record, TEXT_KEYS),
        body_html: first_text(record, HTML_KEYS),
        attachments: record
            .get("attachments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

fn resolve_id(record: &Value) -> Option<String> {
    ID_KEYS
        .iter()
        .find_map(|key| scalar_string(record.get(*key)?))
        .or_else(|| {
            // JSON-LD resources carry their id as the last URI segment.
            record
                .get("@id")
                .and_then(Value::as_str)
                .and_then(|uri| uri.trim_end_matches('/').rsplit('/').next())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
}

fn resolve_from(record: &Value) -> Option<String> {
    match record.get("from") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Object(addr)) => {
            if let Some(address) = addr.get("address").and_then(Value::as_str) {
                return Some(address.to_string());
            }
        }
        _ => {}
    }
    first_text(record, &["mail_from", "sender"])
}

fn resolve_subject(record: &Value) -> String {
    first_text(record, SUBJECT_KEYS)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| NO_SUBJECT.to_string())
}

fn resolve_preview(record: &Value) -> String {
    first_text(record, PREVIEW_KEYS)
        .or_else(|| {
            first_text(record, TEXT_KEYS)
                .map(|text| text.chars().take(PREVIEW_CHARS).collect())
        })
        .unwrap_or_default()
}

fn resolve_date(record: &Value) -> Option<DateTime<Utc>> {
    DATE_KEYS
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(parse_date)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), and unix seconds as
/// either a number or a numeric string.
fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) =
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            {
                return Some(naive.and_utc());
            }
            s.parse::<i64>()
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        }
        _ => None,
    }
}

/// First key whose value is a non-empty string, or an array of strings
/// (joined with newlines).
fn first_text(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
