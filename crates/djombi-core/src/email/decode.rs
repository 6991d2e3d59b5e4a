//! Decoding of list responses from the email service.
//!
//! The service does not return a stable shape: the list may be the body
//! itself, or sit under `data`, `emails`, the category name, its plural, or
//! one of those nested under `data`. Matchers are tried in order; the last
//! resort is any key holding a non-empty array of objects.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::{Category, Email};

/// Why a list payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No array of emails was found anywhere in the payload.
    #[error("no email list in response")]
    MissingList,
    /// An element of the list was not a JSON object.
    #[error("email at index {0} is not an object")]
    NotAnObject(usize),
}

/// A decoded list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListPayload {
    /// The normalized emails.
    Emails(Vec<Email>),
    /// The service reported that the category is empty.
    Empty,
    /// The service reported a failure with this message.
    Rejected(String),
}

/// Where a list may be found.
#[derive(Debug, Clone, Copy)]
enum Matcher {
    Root,
    Key(KeyName),
    Nested(KeyName),
}

#[derive(Debug, Clone, Copy)]
enum KeyName {
    Data,
    Emails,
    Category,
    Plural,
}

const MATCHERS: [Matcher; 9] = [
    Matcher::Root,
    Matcher::Key(KeyName::Data),
    Matcher::Key(KeyName::Emails),
    Matcher::Key(KeyName::Category),
    Matcher::Key(KeyName::Plural),
    Matcher::Nested(KeyName::Data),
    Matcher::Nested(KeyName::Emails),
    Matcher::Nested(KeyName::Category),
    Matcher::Nested(KeyName::Plural),
];

impl KeyName {
    fn resolve(self, category: Category) -> String {
        match self {
            Self::Data => "data".to_string(),
            Self::Emails => "emails".to_string(),
            Self::Category => category.as_str().to_string(),
            Self::Plural => category.plural(),
        }
    }
}

impl Matcher {
    fn find(self, body: &Value, category: Category) -> Option<&Vec<Value>> {
        match self {
            Self::Root => body.as_array(),
            Self::Key(key) => body.get(key.resolve(category))?.as_array(),
            Self::Nested(key) => body.get("data")?.get(key.resolve(category))?.as_array(),
        }
    }
}

/// Words that, shortly after "no", name the list being empty.
const LIST_WORDS: [&str; 9] = [
    "email", "emails", "draft", "drafts", "message", "messages", "inbox", "sent", "spam",
];

/// True when a failure message means "there is nothing in this category".
///
/// "No spam emails found" matches; "No access to this email account" does
/// not, since the word after "no" is not a list word.
#[must_use]
pub fn indicates_no_emails(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    if message.contains("not found") || message.contains("empty") {
        return true;
    }
    let words: Vec<&str> = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    words.iter().enumerate().any(|(index, word)| {
        *word == "no"
            && words
                .iter()
                .skip(index + 1)
                .take(2)
                .any(|next| LIST_WORDS.contains(next))
    })
}

/// Decodes a list response for `category`.
///
/// `now` stamps records without timestamps and seeds synthetic ids.
///
/// # Errors
///
/// Returns an error when no list is present or an item is not an object.
pub fn decode_list(
    body: &Value,
    category: Category,
    now: DateTime<Utc>,
) -> Result<ListPayload, DecodeError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        return Ok(if indicates_no_emails(&message) {
            ListPayload::Empty
        } else {
            ListPayload::Rejected(message)
        });
    }

    let items = MATCHERS
        .iter()
        .find_map(|matcher| matcher.find(body, category))
        .or_else(|| any_object_array(body))
        .or_else(|| body.get("data").and_then(any_object_array))
        .ok_or(DecodeError::MissingList)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object()
                .map(|raw| normalize_email(raw, category, index, now))
                .ok_or(DecodeError::NotAnObject(index))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(ListPayload::Emails)
}

fn any_object_array(value: &Value) -> Option<&Vec<Value>> {
    value.as_object()?.values().find_map(|v| {
        v.as_array()
            .filter(|items| !items.is_empty() && items.iter().all(Value::is_object))
    })
}

/// Maps one upstream record onto [`Email`], defaulting missing fields.
#[must_use]
pub fn normalize_email(
    raw: &Map<String, Value>,
    category: Category,
    index: usize,
    now: DateTime<Utc>,
) -> Email {
    let id = text(raw, &["id", "_id", "message_id", "messageId"])
        .unwrap_or_else(|| format!("{category}-{}-{index}", now.timestamp_millis()));
    let timestamp = text(
        raw,
        &["timestamp", "date", "sent_at", "sentAt", "created_at", "createdAt"],
    )
    .unwrap_or_else(|| now.to_rfc3339());
    let created_at = text(raw, &["created_at", "createdAt"]).unwrap_or_else(|| timestamp.clone());
    let content = text(raw, &["content", "body", "html", "text", "message"]).unwrap_or_default();
    let content_type = text(raw, &["content_type", "contentType"]).unwrap_or_else(|| {
        let guessed = if looks_like_html(&content) { "text/html" } else { "text/plain" };
        guessed.to_string()
    });
    let has_attachment = flag(raw, &["has_attachment", "hasAttachment"]).unwrap_or_else(|| {
        raw.get("attachments")
            .and_then(Value::as_array)
            .is_some_and(|a| !a.is_empty())
    });

    Email {
        id,
        email_id: text(raw, &["email_id", "emailId"]).unwrap_or_default(),
        from: address(raw, &["from", "sender", "from_email", "fromEmail"]).unwrap_or_default(),
        to: address(raw, &["to", "recipient", "recipients", "to_email", "toEmail"])
            .unwrap_or_default(),
        subject: text(raw, &["subject"]).unwrap_or_else(|| "(no subject)".to_string()),
        content,
        timestamp,
        created_at,
        is_urgent: flag(raw, &["is_urgent", "isUrgent", "urgent"]).unwrap_or(false),
        has_attachment,
        status: category,
        category,
        is_read: flag(raw, &["is_read", "isRead", "read"]).unwrap_or(category != Category::Inbox),
        content_type,
    }
}

fn first<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn text(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match first(raw, keys)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(raw: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    match first(raw, keys)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Addresses may come as a string, `{email, name}`, or a list of either.
fn address(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    fn one(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o
                .get("email")
                .or_else(|| o.get("address"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
            _ => None,
        }
    }

    let value = first(raw, keys)?;
    match value {
        Value::Array(items) => {
            let joined = items.iter().filter_map(one).collect::<Vec<_>>().join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        other => one(other).filter(|s| !s.is_empty()),
    }
}

fn looks_like_html(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.starts_with('<') && trimmed.contains('>')
}
