//! replay-core: scripted two-party chat playback.
//!
//! - **script**: parse persisted chat records into a typed [`MessageScript`].
//! - **store**: where records live (JSON files or memory).
//! - **bootstrap**: load a session or signal a redirect to the authoring flow.
//! - **scheduler**: timed reveal with typing, read receipts and emoji overlays.
//! - **renderer**: pure transcript view of a playback snapshot.
//! - **notify**: per-message notification sinks.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod renderer;
pub mod scheduler;
pub mod script;
pub mod store;

// Top-level re-exports for common usage
pub use crate::bootstrap::{InvalidSession, SessionBootstrap, SessionLoad};
pub use crate::config::{PlaybackTiming, PlayerConfig, SoundConfig};
pub use crate::error::{EntryIssue, ReplayError, Result, SessionLoadError};
pub use crate::model::{
    DisplayedMessage, EntryBody, EntryKind, MessageEntry, MessageScript, MoneyDirection,
    Participant, Participants, Role,
};
pub use crate::notify::{CommandSound, NotificationSink, NullSink, TerminalBell};
pub use crate::renderer::{render, RenderOptions, RenderedTranscript};
pub use crate::scheduler::{
    PlaybackEvent, PlaybackPhase, PlaybackScheduler, PlaybackSession, TranscriptState,
};
pub use crate::script::{encode_script, parse_script, LoadedScript};
pub use crate::store::{JsonFileStore, MemoryStore, SessionStore};
