//! Playback and player configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::{ReplayError, Result};

/// Fixed delays that drive playback.
///
/// Only the ordering matters for correctness: every delay is positive, the
/// first message never waits longer than later ones, and typing never takes
/// longer than the gap between messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTiming {
    /// Wait before the first entry starts typing
    #[serde(with = "millis", default = "default_initial")]
    pub initial_delay: Duration,
    /// Wait before every later entry starts typing
    #[serde(with = "millis", default = "default_interval")]
    pub interval_delay: Duration,
    /// Time spent "typing" before the entry appears
    #[serde(with = "millis", default = "default_typing")]
    pub typing_delay: Duration,
    /// Time after reveal until a counterpart message is marked read
    #[serde(with = "millis", default = "default_read")]
    pub read_delay: Duration,
    /// How long an emoji overlay stays on screen
    #[serde(with = "millis", default = "default_overlay")]
    pub overlay_duration: Duration,
}

fn default_initial() -> Duration {
    Duration::from_millis(1000)
}

fn default_interval() -> Duration {
    Duration::from_millis(3000)
}

fn default_typing() -> Duration {
    Duration::from_millis(2000)
}

fn default_read() -> Duration {
    Duration::from_millis(1500)
}

fn default_overlay() -> Duration {
    Duration::from_millis(2000)
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            initial_delay: default_initial(),
            interval_delay: default_interval(),
            typing_delay: default_typing(),
            read_delay: default_read(),
            overlay_duration: default_overlay(),
        }
    }
}

impl PlaybackTiming {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("initial_delay", self.initial_delay),
            ("interval_delay", self.interval_delay),
            ("typing_delay", self.typing_delay),
            ("read_delay", self.read_delay),
            ("overlay_duration", self.overlay_duration),
        ];
        for (name, delay) in all {
            if delay.is_zero() {
                return Err(ReplayError::Config(format!("{} must be positive", name)));
            }
        }
        if self.initial_delay > self.interval_delay {
            return Err(ReplayError::Config(
                "initial_delay must not exceed interval_delay".into(),
            ));
        }
        if self.typing_delay > self.interval_delay {
            return Err(ReplayError::Config(
                "typing_delay must not exceed interval_delay".into(),
            ));
        }
        Ok(())
    }

    /// Speed playback up (`speed > 1`) or slow it down (`speed < 1`).
    ///
    /// Each delay is clamped to at least one millisecond so the result still
    /// validates.
    pub fn scaled(&self, speed: f64) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ReplayError::Config(format!(
                "speed must be a positive number, got {}",
                speed
            )));
        }
        let scale = |d: Duration| {
            Duration::try_from_secs_f64(d.as_secs_f64() / speed)
                .unwrap_or(Duration::MAX)
                .max(Duration::from_millis(1))
        };
        Ok(Self {
            initial_delay: scale(self.initial_delay),
            interval_delay: scale(self.interval_delay),
            typing_delay: scale(self.typing_delay),
            read_delay: scale(self.read_delay),
            overlay_duration: scale(self.overlay_duration),
        })
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Notification sound settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// External player invoked per message, e.g. `["paplay", "/path/to/pop.wav"]`.
    /// Falls back to the terminal bell when empty.
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: Vec::new(),
        }
    }
}

/// Configuration for the terminal player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Key the authoring flow saved the script under
    #[serde(default = "default_session_key")]
    pub session_key: String,
    /// Storage root override; `None` defers to `replay_common::replay_root()`
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub timing: PlaybackTiming,
    #[serde(default)]
    pub sound: SoundConfig,
    /// Transcript width in columns
    #[serde(default = "default_width")]
    pub width: usize,
    /// Fixed UTC offset for timestamps; local offset when unset
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

fn default_session_key() -> String {
    "chatData".to_string()
}

fn default_width() -> usize {
    60
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            root: None,
            timing: PlaybackTiming::default(),
            sound: SoundConfig::default(),
            width: default_width(),
            utc_offset_minutes: None,
        }
    }
}

/// Default location of the player config file
pub fn default_config_path() -> Option<PathBuf> {
    replay_common::app_config_dir().map(|d| d.join("player.json"))
}

impl PlayerConfig {
    /// Storage root, honouring the override
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(replay_common::replay_root)
    }

    pub async fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load_from(&path).await,
            None => Ok(Self::default()),
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;

        if content.trim().is_empty() {
            tracing::warn!("Player config is empty, using default config");
            return Ok(Self::default());
        }

        let config: PlayerConfig = match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse player config ({}), using default. File may be corrupted.",
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = config.timing.validate() {
            tracing::warn!("Invalid timing in player config ({}), using default timing", e);
            return Ok(Self {
                timing: PlaybackTiming::default(),
                ..config
            });
        }

        Ok(config)
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        let path = default_config_path()
            .ok_or_else(|| ReplayError::Config("could not determine config dir".into()))?;
        self.save_to(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_timing_is_valid() {
        let timing = PlaybackTiming::default();
        assert!(timing.validate().is_ok());
        assert!(timing.initial_delay <= timing.interval_delay);
        assert!(timing.typing_delay <= timing.interval_delay);
    }

    #[test]
    fn test_zero_delay_is_rejected() {
        let timing = PlaybackTiming {
            read_delay: Duration::ZERO,
            ..PlaybackTiming::default()
        };
        assert!(matches!(timing.validate(), Err(ReplayError::Config(_))));
    }

    #[test]
    fn test_initial_longer_than_interval_is_rejected() {
        let timing = PlaybackTiming {
            initial_delay: Duration::from_secs(10),
            ..PlaybackTiming::default()
        };
        assert!(timing.validate().is_err());
    }

    #[test]
    fn test_scaled_keeps_ordering() {
        let fast = PlaybackTiming::default().scaled(4.0).unwrap();
        assert!(fast.validate().is_ok());
        assert!(fast.initial_delay < PlaybackTiming::default().initial_delay);

        let tiny = PlaybackTiming::default().scaled(1_000_000.0).unwrap();
        assert!(tiny.validate().is_ok());

        assert!(PlaybackTiming::default().scaled(0.0).is_err());
        assert!(PlaybackTiming::default().scaled(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_player_config_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("player.json");
        std::fs::write(&path, r#"{ "session_key": "demo", "timing": { "typing_delay": 500 } }"#)
            .unwrap();

        let config = PlayerConfig::load_from(&path).await.unwrap();
        assert_eq!(config.session_key, "demo");
        assert_eq!(config.timing.typing_delay, Duration::from_millis(500));
        assert_eq!(config.timing.interval_delay, default_interval());
        assert_eq!(config.width, 60);
        assert!(config.sound.enabled);
    }

    #[tokio::test]
    async fn test_player_config_corrupt_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("player.json");
        std::fs::write(&path, "{ broken").unwrap();

        let config = PlayerConfig::load_from(&path).await.unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[tokio::test]
    async fn test_player_config_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("player.json");
        let config = PlayerConfig {
            session_key: "saved".into(),
            width: 80,
            ..PlayerConfig::default()
        };

        config.save_to(&path).await.unwrap();
        let loaded = PlayerConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }
}
