//! Session bootstrap: turn a stored record into a playable script, or send the
//! caller back to the authoring flow.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{EntryIssue, SessionLoadError};
use crate::model::MessageScript;
use crate::script::parse_script;
use crate::store::SessionStore;

/// Signal that playback cannot start and the authoring flow should be shown
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidSession {
    pub key: String,
    pub reason: SessionLoadError,
}

/// Outcome of loading a session. Loading never fails with an error: anything
/// unusable becomes a redirect.
#[derive(Debug, Clone)]
pub enum SessionLoad {
    Ready {
        script: Arc<MessageScript>,
        issues: Vec<EntryIssue>,
    },
    Redirect(InvalidSession),
}

impl SessionLoad {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionLoad::Ready { .. })
    }

    pub fn script(&self) -> Option<&Arc<MessageScript>> {
        match self {
            SessionLoad::Ready { script, .. } => Some(script),
            SessionLoad::Redirect(_) => None,
        }
    }
}

pub struct SessionBootstrap {
    store: Arc<dyn SessionStore>,
    key: String,
}

impl SessionBootstrap {
    pub fn new(store: Arc<dyn SessionStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load and parse the session record. All-or-nothing.
    pub async fn load(&self) -> SessionLoad {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return self.redirect(SessionLoadError::NotFound {
                    key: self.key.clone(),
                })
            }
            Err(e) => return self.redirect(SessionLoadError::Store(e.to_string())),
        };

        match parse_script(&raw) {
            Ok(loaded) => {
                info!(
                    "[Bootstrap] Loaded '{}': {} entries, {} repaired",
                    self.key,
                    loaded.script.len(),
                    loaded.issues.len()
                );
                SessionLoad::Ready {
                    script: Arc::new(loaded.script),
                    issues: loaded.issues,
                }
            }
            Err(reason) => self.redirect(reason),
        }
    }

    fn redirect(&self, reason: SessionLoadError) -> SessionLoad {
        if reason.is_not_found() {
            info!("[Bootstrap] No session stored under '{}'", self.key);
        } else {
            warn!("[Bootstrap] Session '{}' is unusable: {}", self.key, reason);
        }
        SessionLoad::Redirect(InvalidSession {
            key: self.key.clone(),
            reason,
        })
    }
}
