//! Parse boundary between persisted session records and [`MessageScript`].
//!
//! Two record shapes are accepted:
//!
//! ```text
//! { participants: { A: {name, avatarUrl}, B: {...} }, entries: [...], background? }
//! { man: {name, profilePicture}, woman: {...}, messages: [...], background? }   (legacy)
//! ```
//!
//! Structural problems fail the whole load. Problems inside a single entry are
//! repaired with a fallback and reported as [`EntryIssue`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use crate::error::{EntryIssue, Result, SessionLoadError};
use crate::model::{
    format_amount, EntryBody, EntryKind, MessageEntry, MessageScript, MoneyDirection, Participant,
    Participants, Role,
};

/// Currency used when a money entry does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Caption used for image entries with no text.
pub const DEFAULT_IMAGE_CAPTION: &str = "Photo";

/// A successfully parsed script plus the per-entry repairs applied to it
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScript {
    pub script: MessageScript,
    pub issues: Vec<EntryIssue>,
}

/// One entry as stored. Every field is read loosely: the authoring flow saves
/// strings and numbers interchangeably, and a bad value in one field must not
/// sink the whole record.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    sender: Option<Value>,
    #[serde(default, alias = "type")]
    kind: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    currency: Option<Value>,
    #[serde(default)]
    image_url: Option<Value>,
    #[serde(default)]
    is_request: Option<Value>,
}

/// Which record shape an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Canonical,
    Legacy,
}

/// Parse a persisted session record.
pub fn parse_script(raw: &str) -> std::result::Result<LoadedScript, SessionLoadError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| SessionLoadError::MalformedJson(e.to_string()))?;
    parse_value(&value)
}

/// Parse an already-decoded session record.
pub fn parse_value(value: &Value) -> std::result::Result<LoadedScript, SessionLoadError> {
    let record = value
        .as_object()
        .ok_or_else(|| SessionLoadError::MalformedJson("record is not a JSON object".into()))?;

    let participants = parse_participants(record)?;
    let shape = if record.contains_key("participants") {
        Shape::Canonical
    } else {
        Shape::Legacy
    };

    let raw_entries = record
        .get("entries")
        .or_else(|| record.get("messages"))
        .and_then(Value::as_array)
        .ok_or(SessionLoadError::EntriesNotArray)?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw) in raw_entries.iter().enumerate() {
        let entry = parse_entry(index, raw, shape, &mut issues)?;
        if !seen.insert(entry.id.clone()) {
            return Err(SessionLoadError::DuplicateEntryId(entry.id));
        }
        entries.push(entry);
    }

    let background = record
        .get("background")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    for issue in &issues {
        warn!("[Script] {}", issue);
    }

    Ok(LoadedScript {
        script: MessageScript {
            participants,
            entries,
            background,
        },
        issues,
    })
}

fn parse_participants(
    record: &Map<String, Value>,
) -> std::result::Result<Participants, SessionLoadError> {
    let (a, b) = match record.get("participants") {
        Some(Value::Object(p)) => (
            p.get("A").or_else(|| p.get("man")),
            p.get("B").or_else(|| p.get("woman")),
        ),
        Some(_) => return Err(SessionLoadError::MissingParticipants),
        None => {
            if !record.contains_key("man") && !record.contains_key("woman") {
                return Err(SessionLoadError::MissingParticipants);
            }
            (record.get("man"), record.get("woman"))
        }
    };

    Ok(Participants {
        a: parse_participant(Role::A, a)?,
        b: parse_participant(Role::B, b)?,
    })
}

fn parse_participant(
    role: Role,
    value: Option<&Value>,
) -> std::result::Result<Participant, SessionLoadError> {
    let value = value
        .filter(|v| v.is_object())
        .ok_or(SessionLoadError::MissingParticipant(role))?;
    let participant: Participant = serde_json::from_value(value.clone())
        .map_err(|_| SessionLoadError::MissingParticipant(role))?;

    if participant.name.trim().is_empty() {
        return Err(SessionLoadError::EmptyParticipantName(role));
    }
    Ok(participant)
}

fn parse_entry(
    index: usize,
    value: &Value,
    shape: Shape,
    issues: &mut Vec<EntryIssue>,
) -> std::result::Result<MessageEntry, SessionLoadError> {
    if !value.is_object() {
        return Err(SessionLoadError::EntryNotObject { index });
    }
    let raw: RawEntry = serde_json::from_value(value.clone())
        .map_err(|e| SessionLoadError::MalformedJson(format!("entry #{}: {}", index, e)))?;

    let sender_value = match &raw.sender {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let sender = Role::from_wire(&sender_value).ok_or(SessionLoadError::UnknownSender {
        index,
        value: sender_value,
    })?;

    let id = match raw.id.as_ref().and_then(id_string) {
        Some(id) => id,
        None => {
            let assigned = format!("entry-{}", Uuid::new_v4());
            issues.push(EntryIssue::MissingId {
                index,
                assigned: assigned.clone(),
            });
            assigned
        }
    };

    let kind = match &raw.kind {
        None | Some(Value::Null) => EntryKind::Text,
        Some(value) => {
            let found = value.as_str().and_then(EntryKind::from_wire);
            found.unwrap_or_else(|| {
                let kind = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                issues.push(EntryIssue::UnknownKind {
                    id: id.clone(),
                    kind,
                });
                EntryKind::Text
            })
        }
    };

    let content = match &raw.content {
        Some(Value::Number(n)) => n.to_string(),
        other => loose_text(&id, "content", other.as_ref(), issues).unwrap_or_default(),
    };
    let body = match kind {
        EntryKind::Text => EntryBody::Text { content },
        EntryKind::Emoji => EntryBody::Emoji { emoji: content },
        EntryKind::Money => money_body(&id, &raw, content, shape, issues),
        EntryKind::Image => image_body(&id, &raw, content, issues),
    };

    Ok(MessageEntry { id, sender, body })
}

fn money_body(
    id: &str,
    raw: &RawEntry,
    content: String,
    shape: Shape,
    issues: &mut Vec<EntryIssue>,
) -> EntryBody {
    let amount = match raw.amount.as_ref().and_then(amount_f64) {
        Some(amount) => amount,
        None => {
            issues.push(EntryIssue::MissingAmount { id: id.to_string() });
            0.0
        }
    };

    let currency = loose_text(id, "currency", raw.currency.as_ref(), issues);
    let currency = match currency.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => {
            issues.push(EntryIssue::MissingCurrency {
                id: id.to_string(),
                fallback: DEFAULT_CURRENCY.to_string(),
            });
            DEFAULT_CURRENCY.to_string()
        }
    };

    let fallback = || format!("{} {}", format_amount(amount), currency);
    let caption = non_empty_caption(id, content, fallback, issues);

    EntryBody::Money {
        caption,
        amount,
        currency,
        direction: money_direction(id, raw.is_request.as_ref(), shape, issues),
    }
}

fn money_direction(
    id: &str,
    value: Option<&Value>,
    shape: Shape,
    issues: &mut Vec<EntryIssue>,
) -> MoneyDirection {
    let flag = match value {
        None | Some(Value::Null) => {
            if shape == Shape::Legacy {
                issues.push(EntryIssue::AssumedDirection { id: id.to_string() });
            }
            false
        }
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => false,
        Some(_) => {
            issues.push(EntryIssue::MistypedField {
                id: id.to_string(),
                field: "isRequest",
            });
            false
        }
    };
    MoneyDirection::from_flag(flag)
}

fn image_body(
    id: &str,
    raw: &RawEntry,
    content: String,
    issues: &mut Vec<EntryIssue>,
) -> EntryBody {
    let image_url = loose_text(id, "imageUrl", raw.image_url.as_ref(), issues);
    let image_url = image_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    if image_url.is_none() {
        issues.push(EntryIssue::MissingImageUrl { id: id.to_string() });
    }

    let caption = non_empty_caption(id, content, || DEFAULT_IMAGE_CAPTION.to_string(), issues);
    EntryBody::Image { caption, image_url }
}

fn non_empty_caption(
    id: &str,
    content: String,
    fallback: impl FnOnce() -> String,
    issues: &mut Vec<EntryIssue>,
) -> String {
    if !content.trim().is_empty() {
        return content;
    }
    let caption = fallback();
    issues.push(EntryIssue::EmptyCaption {
        id: id.to_string(),
        caption: caption.clone(),
    });
    caption
}

/// A string field. Any other non-null value is reported and dropped.
fn loose_text(
    id: &str,
    field: &'static str,
    value: Option<&Value>,
    issues: &mut Vec<EntryIssue>,
) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        _ => {
            issues.push(EntryIssue::MistypedField {
                id: id.to_string(),
                field,
            });
            None
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_f64(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    amount.is_finite().then_some(amount)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordOut<'a> {
    participants: &'a Participants,
    entries: Vec<EntryOut<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    background: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryOut<'a> {
    id: &'a str,
    sender: Role,
    kind: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_request: Option<bool>,
}

impl<'a> From<&'a MessageEntry> for EntryOut<'a> {
    fn from(entry: &'a MessageEntry) -> Self {
        let mut out = EntryOut {
            id: &entry.id,
            sender: entry.sender,
            kind: entry.kind().as_str(),
            content: entry.body.caption(),
            amount: None,
            currency: None,
            image_url: None,
            is_request: None,
        };
        match &entry.body {
            EntryBody::Money {
                amount,
                currency,
                direction,
                ..
            } => {
                out.amount = Some(*amount);
                out.currency = Some(currency);
                out.is_request = Some(direction.is_request());
            }
            EntryBody::Image { image_url, .. } => {
                out.image_url = image_url.as_deref();
            }
            EntryBody::Text { .. } | EntryBody::Emoji { .. } => {}
        }
        out
    }
}

/// Serialize a script into the canonical persisted record shape.
pub fn encode_script(script: &MessageScript) -> Result<String> {
    let record = RecordOut {
        participants: &script.participants,
        entries: script.entries.iter().map(EntryOut::from).collect(),
        background: script.background.as_deref(),
    };
    Ok(serde_json::to_string_pretty(&record)?)
}
