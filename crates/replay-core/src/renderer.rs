//! Pure mapping from a transcript snapshot to what the chat screen shows.
//!
//! Nothing here knows about timers: the same state always renders the same
//! transcript, and appending a message never changes earlier rows except for
//! their read indicator.

use chrono::{FixedOffset, Local, Offset};
use serde::Serialize;
use std::fmt;

use crate::model::{
    format_amount, DisplayedMessage, EntryBody, MessageScript, MoneyDirection, Role,
};
use crate::scheduler::{EmojiOverlay, TranscriptState};

/// Particles drawn around special overlay emojis
pub const PARTICLE_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Offset applied to reveal timestamps
    pub utc_offset: FixedOffset,
    /// Target width in columns for the text form
    pub width: usize,
}

impl RenderOptions {
    pub fn utc(width: usize) -> Self {
        Self {
            utc_offset: chrono::Utc.fix(),
            width,
        }
    }

    /// Current local offset
    pub fn local(width: usize) -> Self {
        Self {
            utc_offset: Local::now().offset().fix(),
            width,
        }
    }

    /// Fixed offset in minutes, or the local one when unset or out of range.
    pub fn with_offset_minutes(width: usize, minutes: Option<i32>) -> Self {
        match minutes.and_then(|m| FixedOffset::east_opt(m.saturating_mul(60))) {
            Some(utc_offset) => Self { utc_offset, width },
            None => Self::local(width),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::utc(60)
    }
}

/// Side of the conversation a row is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alignment {
    /// Role A, right side
    Outgoing,
    /// Role B, left side
    Incoming,
}

impl From<Role> for Alignment {
    fn from(role: Role) -> Self {
        if role.is_outgoing() {
            Alignment::Outgoing
        } else {
            Alignment::Incoming
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReadIndicator {
    Sent,
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Avatar {
    pub url: String,
    /// Fallback when the picture cannot be shown
    pub initial: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Bubble {
    Text {
        text: String,
    },
    Money {
        sender_name: String,
        amount_label: String,
        direction: MoneyDirection,
        caption: String,
    },
    Image {
        url: Option<String>,
        caption: String,
    },
    Emoji {
        emoji: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub id: String,
    pub alignment: Alignment,
    pub avatar: Avatar,
    pub bubble: Bubble,
    /// `HH:MM` of the reveal
    pub time: String,
    /// Only present on outgoing rows
    pub read: Option<ReadIndicator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub name: String,
    pub avatar: Avatar,
    /// `typing...` while anyone types, else `online`
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypingRow {
    pub sender: Role,
    pub alignment: Alignment,
    pub avatar: Avatar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverlayAnimation {
    Bounce,
    Pulse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParticlePalette {
    /// Red to pink
    Rose,
    /// Blue to purple
    Diamond,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayView {
    pub emoji: String,
    pub animation: OverlayAnimation,
    pub particles: Option<ParticlePalette>,
}

impl OverlayView {
    pub fn for_emoji(emoji: &str) -> Self {
        let animation = match emoji {
            "😘" | "🦁" | "💎" => OverlayAnimation::Bounce,
            _ => OverlayAnimation::Pulse,
        };
        let particles = match emoji {
            "🌹" => Some(ParticlePalette::Rose),
            "💎" => Some(ParticlePalette::Diamond),
            _ => None,
        };
        Self {
            emoji: emoji.to_string(),
            animation,
            particles,
        }
    }
}

impl From<&EmojiOverlay> for OverlayView {
    fn from(overlay: &EmojiOverlay) -> Self {
        Self::for_emoji(&overlay.emoji)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTranscript {
    pub header: Header,
    pub background: Option<String>,
    pub rows: Vec<RenderedRow>,
    pub typing: Option<TypingRow>,
    pub overlay: Option<OverlayView>,
    #[serde(skip)]
    width: usize,
}

fn avatar(script: &MessageScript, role: Role) -> Avatar {
    let participant = script.participant(role);
    Avatar {
        url: participant.avatar_url.clone(),
        initial: participant.initial(),
    }
}

fn bubble(message: &DisplayedMessage, script: &MessageScript) -> Bubble {
    match &message.entry.body {
        EntryBody::Text { content } => Bubble::Text {
            text: content.clone(),
        },
        EntryBody::Money {
            caption,
            amount,
            currency,
            direction,
        } => Bubble::Money {
            sender_name: script.participant(message.sender()).name.clone(),
            amount_label: format!("{} {}", format_amount(*amount), currency),
            direction: *direction,
            caption: caption.clone(),
        },
        EntryBody::Image { caption, image_url } => Bubble::Image {
            url: image_url.clone(),
            caption: caption.clone(),
        },
        EntryBody::Emoji { emoji } => Bubble::Emoji {
            emoji: emoji.clone(),
        },
    }
}

fn row(
    message: &DisplayedMessage,
    script: &MessageScript,
    options: &RenderOptions,
) -> RenderedRow {
    let sender = message.sender();
    let read = match sender {
        Role::A if message.is_read => Some(ReadIndicator::Read),
        Role::A => Some(ReadIndicator::Sent),
        Role::B => None,
    };
    RenderedRow {
        id: message.id().to_string(),
        alignment: sender.into(),
        avatar: avatar(script, sender),
        bubble: bubble(message, script),
        time: message
            .revealed_at
            .with_timezone(&options.utc_offset)
            .format("%H:%M")
            .to_string(),
        read,
    }
}

/// Render the current transcript.
pub fn render(
    state: &TranscriptState,
    script: &MessageScript,
    options: &RenderOptions,
) -> RenderedTranscript {
    let counterpart = script.participant(Role::B);
    let typing_sender = state.typing_sender();

    RenderedTranscript {
        header: Header {
            name: counterpart.name.clone(),
            avatar: avatar(script, Role::B),
            status: if typing_sender.is_some() {
                "typing...".to_string()
            } else {
                "online".to_string()
            },
        },
        background: script.background.clone(),
        rows: state
            .displayed
            .iter()
            .map(|m| row(m, script, options))
            .collect(),
        typing: typing_sender.map(|sender| TypingRow {
            sender,
            alignment: sender.into(),
            avatar: avatar(script, sender),
        }),
        overlay: state.overlay.as_ref().map(OverlayView::from),
        width: options.width,
    }
}

impl fmt::Display for Bubble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bubble::Text { text } => write!(f, "{}", text),
            Bubble::Money {
                sender_name,
                amount_label,
                direction,
                caption,
            } => {
                let (icon, verb) = match direction {
                    MoneyDirection::Sent => ("💰", "sent"),
                    MoneyDirection::Request => ("💸", "requested"),
                };
                write!(f, "{} {} {} {}", icon, sender_name, verb, amount_label)?;
                if !caption.is_empty() && caption != amount_label {
                    write!(f, " · {}", caption)?;
                }
                Ok(())
            }
            Bubble::Image { url, caption } => match url {
                Some(url) => write!(f, "🖼 {} <{}>", caption, url),
                None => write!(f, "🖼 {} (no image)", caption),
            },
            Bubble::Emoji { emoji } => write!(f, "{}", emoji),
        }
    }
}

impl fmt::Display for ReadIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadIndicator::Sent => write!(f, "✓"),
            ReadIndicator::Read => write!(f, "✓✓"),
        }
    }
}

fn columns(s: &str) -> usize {
    s.chars().count()
}

fn write_aligned(
    f: &mut fmt::Formatter<'_>,
    alignment: Alignment,
    width: usize,
    line: &str,
) -> fmt::Result {
    match alignment {
        Alignment::Incoming => writeln!(f, "{}", line),
        Alignment::Outgoing => {
            let pad = width.saturating_sub(columns(line));
            writeln!(f, "{}{}", " ".repeat(pad), line)
        }
    }
}

impl fmt::Display for RenderedTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width.max(20);

        writeln!(
            f,
            "[{}] {} · {}",
            self.header.avatar.initial, self.header.name, self.header.status
        )?;
        writeln!(f, "{}", "─".repeat(width))?;

        for row in &self.rows {
            let line = match (row.alignment, row.read) {
                (Alignment::Outgoing, Some(read)) => {
                    format!("{}  {} {} [{}]", row.bubble, row.time, read, row.avatar.initial)
                }
                (Alignment::Outgoing, None) => {
                    format!("{}  {} [{}]", row.bubble, row.time, row.avatar.initial)
                }
                (Alignment::Incoming, _) => {
                    format!("[{}] {}  {}", row.avatar.initial, row.bubble, row.time)
                }
            };
            write_aligned(f, row.alignment, width, &line)?;
        }

        if let Some(typing) = &self.typing {
            let line = match typing.alignment {
                Alignment::Outgoing => format!("• • • [{}]", typing.avatar.initial),
                Alignment::Incoming => format!("[{}] • • •", typing.avatar.initial),
            };
            write_aligned(f, typing.alignment, width, &line)?;
        }

        if let Some(overlay) = &self.overlay {
            let decorated = match overlay.particles {
                Some(_) => {
                    let sparkles = "✦".repeat(PARTICLE_COUNT / 2);
                    format!("{} {} {}", sparkles, overlay.emoji, sparkles)
                }
                None => overlay.emoji.clone(),
            };
            let pad = width.saturating_sub(columns(&decorated)) / 2;
            writeln!(f)?;
            writeln!(f, "{}{}", " ".repeat(pad), decorated)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MessageEntry, Participant};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn script() -> MessageScript {
        MessageScript::new(
            Participant::new("Ahmed", "u1"),
            Participant::new("Fatima", "u2"),
        )
        .with_entry(MessageEntry::text("1", Role::A, "Hello"))
        .with_entry(MessageEntry::money(
            "2",
            Role::A,
            100.0,
            "USD",
            MoneyDirection::Sent,
        ))
        .with_entry(MessageEntry::text("3", Role::B, "Hi"))
    }

    fn revealed(script: &MessageScript, upto: usize) -> TranscriptState {
        let mut state = TranscriptState::new(Uuid::new_v4(), script.len());
        for (index, entry) in script.entries.iter().take(upto).enumerate() {
            assert!(state.begin_typing(index, entry.sender));
            let mut message = DisplayedMessage::reveal(index, entry.clone());
            message.revealed_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap();
            assert!(state.reveal(message));
        }
        state
    }

    #[test]
    fn test_money_shows_amount_and_sender_name() {
        let script = script();
        let state = revealed(&script, 2);
        let out = render(&state, &script, &RenderOptions::utc(60));

        match &out.rows[1].bubble {
            Bubble::Money {
                sender_name,
                amount_label,
                direction,
                ..
            } => {
                assert_eq!(sender_name, "Ahmed");
                assert_eq!(amount_label, "100 USD");
                assert_eq!(*direction, MoneyDirection::Sent);
            }
            other => panic!("expected money bubble, got {:?}", other),
        }
        assert!(out.to_string().contains("Ahmed sent 100 USD"));
    }

    #[test]
    fn test_request_is_labelled_from_flag() {
        let script = MessageScript::new(Participant::new("A", ""), Participant::new("B", ""))
            .with_entry(MessageEntry::money(
                "1",
                Role::A,
                5.5,
                "EUR",
                MoneyDirection::Request,
            ));
        let state = revealed(&script, 1);
        let text = render(&state, &script, &RenderOptions::utc(60)).to_string();
        assert!(text.contains("A requested 5.5 EUR"));
    }

    #[test]
    fn test_read_indicator_only_on_outgoing_rows() {
        let script = script();
        let mut state = revealed(&script, 3);
        assert!(state.mark_read(2));

        let out = render(&state, &script, &RenderOptions::utc(60));
        assert_eq!(out.rows[0].alignment, Alignment::Outgoing);
        assert_eq!(out.rows[0].read, Some(ReadIndicator::Sent));
        assert_eq!(out.rows[2].alignment, Alignment::Incoming);
        assert_eq!(out.rows[2].read, None);
    }

    #[test]
    fn test_append_keeps_prior_rows() {
        let script = script();
        let options = RenderOptions::utc(60);
        let before = render(&revealed(&script, 2), &script, &options);
        let after = render(&revealed(&script, 3), &script, &options);

        assert_eq!(after.rows.len(), 3);
        assert_eq!(&after.rows[..2], &before.rows[..]);
        assert_eq!(before, render(&revealed(&script, 2), &script, &options));
    }

    #[test]
    fn test_timestamp_uses_offset() {
        let script = script();
        let state = revealed(&script, 1);

        let utc = render(&state, &script, &RenderOptions::utc(60));
        assert_eq!(utc.rows[0].time, "09:05");

        let shifted = render(
            &state,
            &script,
            &RenderOptions::with_offset_minutes(60, Some(150)),
        );
        assert_eq!(shifted.rows[0].time, "11:35");
    }

    #[test]
    fn test_header_status_follows_typing() {
        let script = script();
        let mut state = revealed(&script, 0);
        let idle = render(&state, &script, &RenderOptions::utc(60));
        assert_eq!(idle.header.name, "Fatima");
        assert_eq!(idle.header.avatar.initial, "F");
        assert_eq!(idle.header.status, "online");
        assert!(idle.typing.is_none());

        state.begin_typing(0, Role::A);
        let typing = render(&state, &script, &RenderOptions::utc(60));
        assert_eq!(typing.header.status, "typing...");
        assert_eq!(
            typing.typing.map(|t| t.alignment),
            Some(Alignment::Outgoing)
        );
    }

    #[test]
    fn test_overlay_animation_and_particles() {
        let kiss = OverlayView::for_emoji("😘");
        assert_eq!(kiss.animation, OverlayAnimation::Bounce);
        assert_eq!(kiss.particles, None);

        let rose = OverlayView::for_emoji("🌹");
        assert_eq!(rose.animation, OverlayAnimation::Pulse);
        assert_eq!(rose.particles, Some(ParticlePalette::Rose));

        let diamond = OverlayView::for_emoji("💎");
        assert_eq!(diamond.animation, OverlayAnimation::Bounce);
        assert_eq!(diamond.particles, Some(ParticlePalette::Diamond));
    }

    #[test]
    fn test_image_without_url_renders_caption() {
        let mut entry = MessageEntry::image("1", Role::B, "x");
        entry.body = EntryBody::Image {
            caption: "Photo".into(),
            image_url: None,
        };
        let script = MessageScript::new(Participant::new("A", ""), Participant::new("B", ""))
            .with_entry(entry);
        let state = revealed(&script, 1);
        let text = render(&state, &script, &RenderOptions::utc(40)).to_string();
        assert!(text.contains("Photo (no image)"));
    }
}
