//! Notification sinks pinged once per revealed message.
//!
//! Best effort only: implementations swallow their own failures, and the
//! scheduler additionally isolates panics from a sink.

use std::io::Write;
use std::process::Stdio;
use tracing::debug;

pub trait NotificationSink: Send + Sync {
    /// Fire and forget. Must not block.
    fn notify(&self);
}

/// Sink that does nothing (muted playback)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self) {}
}

/// Rings the terminal bell
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl NotificationSink for TerminalBell {
    fn notify(&self) {
        let mut out = std::io::stdout();
        if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
            debug!("[Notify] Terminal bell failed: {}", e);
        }
    }
}

/// Runs an external sound player, e.g. `paplay pop.wav`, once per message
#[derive(Debug, Clone)]
pub struct CommandSound {
    program: String,
    args: Vec<String>,
}

impl CommandSound {
    /// Build from a command line split into words. `None` when empty.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl NotificationSink for CommandSound {
    fn notify(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("[Notify] No runtime, skipping sound");
            return;
        };

        let spawned = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap in the background so the player never waits on audio
                handle.spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => debug!("[Notify] Sound command '{}' failed: {}", self.program, e),
        }
    }
}
