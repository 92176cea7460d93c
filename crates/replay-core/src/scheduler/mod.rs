//! Timed replay of a [`MessageScript`] into a live transcript.
//!
//! For every entry, in order: wait (initial delay for the first entry, interval
//! delay afterwards), show the typing indicator for the sender, wait the typing
//! delay, then append the entry and ping the notification sink. Counterpart
//! (role B) entries get an independent read-receipt timer; emoji entries also
//! raise a short-lived overlay.
//!
//! All timers belong to the session's [`TimerArena`] and die with it.

pub mod state;
pub mod timers;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PlaybackTiming;
use crate::error::Result;
use crate::model::{DisplayedMessage, EntryBody, MessageScript, Role};
use crate::notify::{NotificationSink, NullSink};

pub use state::{EmojiOverlay, PlaybackEvent, PlaybackPhase, TranscriptState};
pub use timers::{TimerArena, TimerKind};

/// Replays one script. Each call to [`PlaybackScheduler::start`] is a fresh
/// session starting from the first entry.
pub struct PlaybackScheduler {
    script: Arc<MessageScript>,
    timing: PlaybackTiming,
    sink: Arc<dyn NotificationSink>,
}

impl PlaybackScheduler {
    pub fn new(script: Arc<MessageScript>, timing: PlaybackTiming) -> Result<Self> {
        timing.validate()?;
        Ok(Self {
            script,
            timing,
            sink: Arc::new(NullSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn script(&self) -> &Arc<MessageScript> {
        &self.script
    }

    pub fn timing(&self) -> &PlaybackTiming {
        &self.timing
    }

    /// Start a new playback session. Must be called inside a tokio runtime.
    pub fn start(&self) -> PlaybackSession {
        let session_id = Uuid::new_v4();
        let total = self.script.len();

        let (state_tx, state_rx) = watch::channel(TranscriptState::new(session_id, total));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = Arc::new(state_tx);
        let arena = Arc::new(TimerArena::new());

        let playback = Arc::new(Playback {
            session_id,
            script: Arc::clone(&self.script),
            timing: self.timing,
            state: Arc::clone(&state),
            arena: Arc::clone(&arena),
            events: events_tx,
            sink: Arc::clone(&self.sink),
        });

        info!(
            "[Scheduler] Session {} starting: {} entries",
            session_id, total
        );

        if total == 0 {
            if playback.update(TranscriptState::finish) {
                playback.emit(PlaybackEvent::Done { total: 0 });
            }
            info!("[Scheduler] Session {} done: empty script", session_id);
        } else {
            let driver = Arc::clone(&playback);
            arena.spawn_task(TimerKind::Driver, async move { driver.run().await });
        }

        PlaybackSession {
            session_id,
            state,
            state_rx,
            arena,
            events: events_rx,
        }
    }
}

/// Everything the driver loop and its timers share
struct Playback {
    session_id: Uuid,
    script: Arc<MessageScript>,
    timing: PlaybackTiming,
    state: Arc<watch::Sender<TranscriptState>>,
    arena: Arc<TimerArena>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    sink: Arc<dyn NotificationSink>,
}

impl Playback {
    /// Apply a transition unless the session is torn down.
    ///
    /// The torn-down check and the mutation happen under the same watch lock,
    /// so nothing can change state after teardown has returned.
    fn update(&self, transition: impl FnOnce(&mut TranscriptState) -> bool) -> bool {
        self.state.send_if_modified(|state| {
            if state.torn_down {
                return false;
            }
            transition(state)
        })
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    fn ping_sink(&self) {
        let sink = &self.sink;
        if std::panic::catch_unwind(AssertUnwindSafe(|| sink.notify())).is_err() {
            debug!(
                "[Scheduler] Session {}: notification sink panicked, ignored",
                self.session_id
            );
        }
    }

    async fn run(self: Arc<Self>) {
        for (index, entry) in self.script.entries.iter().enumerate() {
            let wait = if index == 0 {
                self.timing.initial_delay
            } else {
                self.timing.interval_delay
            };
            tokio::time::sleep(wait).await;

            if !self.update(|s| s.begin_typing(index, entry.sender)) {
                return;
            }
            self.emit(PlaybackEvent::TypingStarted {
                index,
                sender: entry.sender,
            });

            tokio::time::sleep(self.timing.typing_delay).await;

            let message = DisplayedMessage::reveal(index, entry.clone());
            if !self.update(|s| s.reveal(message)) {
                return;
            }
            debug!(
                "[Scheduler] Session {}: revealed #{} '{}'",
                self.session_id, index, entry.id
            );
            self.emit(PlaybackEvent::Revealed {
                index,
                id: entry.id.clone(),
                sender: entry.sender,
                kind: entry.kind(),
            });
            self.ping_sink();

            if entry.sender == Role::B {
                self.schedule_read_receipt(index, entry.id.clone());
            }
            if let EntryBody::Emoji { emoji } = &entry.body {
                self.raise_overlay(entry.id.clone(), emoji.clone(), entry.sender);
            }
        }

        if self.update(TranscriptState::finish) {
            info!(
                "[Scheduler] Session {} done: {} entries revealed",
                self.session_id,
                self.script.len()
            );
            self.emit(PlaybackEvent::Done {
                total: self.script.len(),
            });
        }
    }

    fn schedule_read_receipt(self: &Arc<Self>, index: usize, id: String) {
        let playback = Arc::clone(self);
        let scheduled =
            self.arena
                .spawn_after(TimerKind::ReadReceipt, self.timing.read_delay, move || {
                    if playback.update(|s| s.mark_read(index)) {
                        playback.emit(PlaybackEvent::ReadReceipt { index, id });
                    }
                });
        if !scheduled {
            debug!(
                "[Scheduler] Session {}: read receipt for #{} not scheduled, session closed",
                self.session_id, index
            );
        }
    }

    fn raise_overlay(self: &Arc<Self>, id: String, emoji: String, sender: Role) {
        let overlay = EmojiOverlay {
            entry_id: id.clone(),
            emoji: emoji.clone(),
            sender,
        };
        if !self.update(|s| s.show_overlay(overlay)) {
            return;
        }
        self.emit(PlaybackEvent::OverlayShown {
            id: id.clone(),
            emoji,
        });

        let playback = Arc::clone(self);
        self.arena.spawn_after(
            TimerKind::OverlayDismiss,
            self.timing.overlay_duration,
            move || {
                if playback.update(|s| s.dismiss_overlay(&id)) {
                    playback.emit(PlaybackEvent::OverlayDismissed { id });
                }
            },
        );
    }
}

/// Handle to a running playback. Dropping it tears the session down.
pub struct PlaybackSession {
    session_id: Uuid,
    state: Arc<watch::Sender<TranscriptState>>,
    state_rx: watch::Receiver<TranscriptState>,
    arena: Arc<TimerArena>,
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
}

impl PlaybackSession {
    pub fn id(&self) -> Uuid {
        self.session_id
    }

    /// Copy of the current transcript
    pub fn snapshot(&self) -> TranscriptState {
        self.state_rx.borrow().clone()
    }

    /// Read-only view that is notified on every change
    pub fn subscribe(&self) -> watch::Receiver<TranscriptState> {
        self.state.subscribe()
    }

    /// Next playback event, or `None` once nothing can happen any more.
    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        self.events.recv().await
    }

    /// Wait until every entry has been revealed (or the session is torn down).
    pub async fn wait_done(&self) -> TranscriptState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|s| s.is_done() || s.torn_down).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Drain events until every timer of the session has fired.
    pub async fn settled(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        events
    }

    pub fn outstanding_timers(&self) -> usize {
        self.arena.outstanding()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state_rx.borrow().torn_down
    }

    /// Cancel every outstanding timer and freeze the transcript. Idempotent.
    pub fn teardown(&self) {
        let cancelled = self.arena.cancel_all();
        let first = self.state.send_if_modified(|state| {
            if state.torn_down {
                return false;
            }
            state.torn_down = true;
            true
        });
        if first {
            info!(
                "[Scheduler] Session {} torn down, {} timers cancelled",
                self.session_id, cancelled
            );
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
