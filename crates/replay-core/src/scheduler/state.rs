use serde::Serialize;
use uuid::Uuid;

use crate::model::{DisplayedMessage, EntryKind, Role};

/// Where playback currently is. Revealing is instantaneous and never observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackPhase {
    Idle,
    Typing(Role),
    Done,
}

/// Full-screen emoji reaction currently on screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiOverlay {
    pub entry_id: String,
    pub emoji: String,
    pub sender: Role,
}

/// Live transcript of one playback session.
///
/// Owned and mutated only by the scheduler; everyone else reads snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptState {
    pub session_id: Uuid,
    pub phase: PlaybackPhase,
    /// Index of the next entry to reveal
    pub cursor: usize,
    /// Number of entries in the script
    pub total: usize,
    /// Append-only, in script order
    pub displayed: Vec<DisplayedMessage>,
    pub overlay: Option<EmojiOverlay>,
    pub torn_down: bool,
}

impl TranscriptState {
    pub fn new(session_id: Uuid, total: usize) -> Self {
        Self {
            session_id,
            phase: PlaybackPhase::Idle,
            cursor: 0,
            total,
            displayed: Vec::new(),
            overlay: None,
            torn_down: false,
        }
    }

    pub fn typing_sender(&self) -> Option<Role> {
        match self.phase {
            PlaybackPhase::Typing(role) => Some(role),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == PlaybackPhase::Done
    }

    pub fn read_count(&self) -> usize {
        self.displayed.iter().filter(|m| m.is_read).count()
    }

    pub(crate) fn begin_typing(&mut self, index: usize, sender: Role) -> bool {
        if self.phase != PlaybackPhase::Idle || index != self.cursor || index >= self.total {
            return false;
        }
        self.phase = PlaybackPhase::Typing(sender);
        true
    }

    /// Append the entry announced by the current typing phase.
    pub(crate) fn reveal(&mut self, message: DisplayedMessage) -> bool {
        match self.phase {
            PlaybackPhase::Typing(sender)
                if sender == message.sender() && message.index == self.cursor => {}
            _ => return false,
        }
        self.displayed.push(message);
        self.cursor += 1;
        self.phase = PlaybackPhase::Idle;
        true
    }

    /// One-shot false -> true flip, counterpart entries only.
    pub(crate) fn mark_read(&mut self, index: usize) -> bool {
        match self.displayed.get_mut(index) {
            Some(message) if message.sender() == Role::B && !message.is_read => {
                message.is_read = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn show_overlay(&mut self, overlay: EmojiOverlay) -> bool {
        self.overlay = Some(overlay);
        true
    }

    /// Clear the overlay only if it is still the one created for `entry_id`.
    pub(crate) fn dismiss_overlay(&mut self, entry_id: &str) -> bool {
        match &self.overlay {
            Some(overlay) if overlay.entry_id == entry_id => {
                self.overlay = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finish(&mut self) -> bool {
        if self.phase != PlaybackPhase::Idle || self.cursor != self.total {
            return false;
        }
        self.phase = PlaybackPhase::Done;
        true
    }
}

/// Ordered notifications about what playback just did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlaybackEvent {
    TypingStarted {
        index: usize,
        sender: Role,
    },
    Revealed {
        index: usize,
        id: String,
        sender: Role,
        kind: EntryKind,
    },
    ReadReceipt {
        index: usize,
        id: String,
    },
    OverlayShown {
        id: String,
        emoji: String,
    },
    OverlayDismissed {
        id: String,
    },
    Done {
        total: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageEntry;

    fn state(total: usize) -> TranscriptState {
        TranscriptState::new(Uuid::new_v4(), total)
    }

    #[test]
    fn test_typing_then_reveal_advances_cursor() {
        let mut s = state(2);
        assert!(s.begin_typing(0, Role::A));
        assert_eq!(s.typing_sender(), Some(Role::A));

        // A second typing phase cannot overlap
        assert!(!s.begin_typing(0, Role::A));
        assert!(!s.begin_typing(1, Role::B));

        let msg = DisplayedMessage::reveal(0, MessageEntry::text("1", Role::A, "Hello"));
        assert!(s.reveal(msg));
        assert_eq!(s.cursor, 1);
        assert_eq!(s.phase, PlaybackPhase::Idle);
        assert_eq!(s.typing_sender(), None);
    }

    #[test]
    fn test_reveal_requires_matching_typing_phase() {
        let mut s = state(1);
        let msg = DisplayedMessage::reveal(0, MessageEntry::text("1", Role::B, "Hi"));
        assert!(!s.reveal(msg.clone()));

        s.begin_typing(0, Role::A);
        assert!(!s.reveal(msg));
        assert!(s.displayed.is_empty());
    }

    #[test]
    fn test_mark_read_only_for_counterpart_and_once() {
        let mut s = state(2);
        s.begin_typing(0, Role::A);
        s.reveal(DisplayedMessage::reveal(0, MessageEntry::text("1", Role::A, "Hello")));
        s.begin_typing(1, Role::B);
        s.reveal(DisplayedMessage::reveal(1, MessageEntry::text("2", Role::B, "Hi")));

        assert!(!s.mark_read(0));
        assert!(s.mark_read(1));
        assert!(!s.mark_read(1));
        assert!(!s.mark_read(7));
        assert_eq!(s.read_count(), 1);
    }

    #[test]
    fn test_finish_only_at_end() {
        let mut empty = state(0);
        assert!(empty.finish());
        assert!(empty.is_done());
        assert!(!empty.begin_typing(0, Role::A));

        let mut s = state(1);
        assert!(!s.finish());
    }

    #[test]
    fn test_dismiss_only_matching_overlay() {
        let mut s = state(0);
        s.show_overlay(EmojiOverlay {
            entry_id: "b".into(),
            emoji: "🔥".into(),
            sender: Role::A,
        });
        assert!(!s.dismiss_overlay("a"));
        assert!(s.overlay.is_some());
        assert!(s.dismiss_overlay("b"));
        assert!(s.overlay.is_none());
    }
}
