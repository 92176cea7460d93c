use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two fixed conversation participants.
///
/// `A` is the outgoing side (right-aligned), `B` the simulated counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "A", alias = "man")]
    A,
    #[serde(rename = "B", alias = "woman")]
    B,
}

impl Role {
    /// Parse a persisted sender value, accepting the legacy `man`/`woman` names.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim() {
            "A" | "a" | "man" => Some(Role::A),
            "B" | "b" | "woman" => Some(Role::B),
            _ => None,
        }
    }

    pub fn is_outgoing(self) -> bool {
        self == Role::A
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::A => write!(f, "A"),
            Role::B => write!(f, "B"),
        }
    }
}

/// Display identity of a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    #[serde(alias = "profilePicture", default)]
    pub avatar_url: String,
}

impl Participant {
    pub fn new(name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar_url: avatar_url.into(),
        }
    }

    /// Avatar fallback: first character of the display name.
    pub fn initial(&self) -> String {
        self.name
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    #[serde(rename = "A")]
    pub a: Participant,
    #[serde(rename = "B")]
    pub b: Participant,
}

impl Participants {
    pub fn get(&self, role: Role) -> &Participant {
        match role {
            Role::A => &self.a,
            Role::B => &self.b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Text,
    Money,
    Emoji,
    Image,
}

impl EntryKind {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(EntryKind::Text),
            "money" => Some(EntryKind::Money),
            "emoji" => Some(EntryKind::Emoji),
            "image" => Some(EntryKind::Image),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Text => "text",
            EntryKind::Money => "money",
            EntryKind::Emoji => "emoji",
            EntryKind::Image => "image",
        }
    }
}

/// Whether a money entry moves money or asks for it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoneyDirection {
    #[default]
    Sent,
    Request,
}

impl MoneyDirection {
    pub fn from_flag(is_request: bool) -> Self {
        if is_request {
            MoneyDirection::Request
        } else {
            MoneyDirection::Sent
        }
    }

    pub fn is_request(self) -> bool {
        self == MoneyDirection::Request
    }
}

/// Kind-specific payload of an entry. Each variant carries only what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EntryBody {
    Text {
        content: String,
    },
    Money {
        caption: String,
        amount: f64,
        currency: String,
        direction: MoneyDirection,
    },
    Emoji {
        emoji: String,
    },
    Image {
        caption: String,
        image_url: Option<String>,
    },
}

impl EntryBody {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryBody::Text { .. } => EntryKind::Text,
            EntryBody::Money { .. } => EntryKind::Money,
            EntryBody::Emoji { .. } => EntryKind::Emoji,
            EntryBody::Image { .. } => EntryKind::Image,
        }
    }

    /// The display text carried by the entry.
    pub fn caption(&self) -> &str {
        match self {
            EntryBody::Text { content } => content,
            EntryBody::Money { caption, .. } => caption,
            EntryBody::Emoji { emoji } => emoji,
            EntryBody::Image { caption, .. } => caption,
        }
    }
}

/// One authored message, before playback reveals it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub id: String,
    pub sender: Role,
    #[serde(flatten)]
    pub body: EntryBody,
}

impl MessageEntry {
    pub fn text(id: impl Into<String>, sender: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender,
            body: EntryBody::Text {
                content: content.into(),
            },
        }
    }

    pub fn money(
        id: impl Into<String>,
        sender: Role,
        amount: f64,
        currency: impl Into<String>,
        direction: MoneyDirection,
    ) -> Self {
        let currency = currency.into();
        Self {
            id: id.into(),
            sender,
            body: EntryBody::Money {
                caption: format!("{} {}", format_amount(amount), currency),
                amount,
                currency,
                direction,
            },
        }
    }

    pub fn emoji(id: impl Into<String>, sender: Role, emoji: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender,
            body: EntryBody::Emoji {
                emoji: emoji.into(),
            },
        }
    }

    pub fn image(id: impl Into<String>, sender: Role, image_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender,
            body: EntryBody::Image {
                caption: "Photo".to_string(),
                image_url: Some(image_url.into()),
            },
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.body.kind()
    }
}

/// The authored conversation loaded at playback start. Read-only during playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageScript {
    pub participants: Participants,
    pub entries: Vec<MessageEntry>,
    pub background: Option<String>,
}

impl MessageScript {
    pub fn new(a: Participant, b: Participant) -> Self {
        Self {
            participants: Participants { a, b },
            entries: Vec::new(),
            background: None,
        }
    }

    pub fn with_entry(mut self, entry: MessageEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn participant(&self, role: Role) -> &Participant {
        self.participants.get(role)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A revealed entry in the live transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedMessage {
    #[serde(flatten)]
    pub entry: MessageEntry,
    /// Position in the script
    pub index: usize,
    pub revealed_at: DateTime<Utc>,
    /// Only ever flips false -> true, and only for role B entries
    pub is_read: bool,
}

impl DisplayedMessage {
    pub fn reveal(index: usize, entry: MessageEntry) -> Self {
        Self {
            entry,
            index,
            revealed_at: Utc::now(),
            is_read: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn sender(&self) -> Role {
        self.entry.sender
    }
}

/// Format an amount without a trailing `.0` for whole numbers.
pub fn format_amount(amount: f64) -> String {
    if !amount.is_finite() {
        return "0".to_string();
    }
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{:.0}", amount)
    } else {
        format!("{}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_wire_accepts_legacy_names() {
        assert_eq!(Role::from_wire("A"), Some(Role::A));
        assert_eq!(Role::from_wire("man"), Some(Role::A));
        assert_eq!(Role::from_wire("woman"), Some(Role::B));
        assert_eq!(Role::from_wire("C"), None);
    }

    #[test]
    fn test_participant_initial() {
        assert_eq!(Participant::new("fatima", "").initial(), "F");
        assert_eq!(Participant::new("  ", "").initial(), "?");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(100.0), "100");
        assert_eq!(format_amount(12.5), "12.5");
        assert_eq!(format_amount(f64::NAN), "0");
    }

    #[test]
    fn test_money_constructor_builds_caption() {
        let entry = MessageEntry::money("m1", Role::A, 100.0, "USD", MoneyDirection::Sent);
        assert_eq!(entry.kind(), EntryKind::Money);
        assert_eq!(entry.body.caption(), "100 USD");
    }

    #[test]
    fn test_displayed_message_starts_unread() {
        let msg = DisplayedMessage::reveal(0, MessageEntry::text("1", Role::B, "Hi"));
        assert!(!msg.is_read);
        assert_eq!(msg.id(), "1");
        assert_eq!(msg.sender(), Role::B);
    }
}
