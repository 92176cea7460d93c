//! Terminal player for scripted chat replays.
//!
//! Loads the session the authoring flow saved, plays it back with typing
//! indicators and read receipts, and redraws the transcript on every change.

use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use replay_core::{
    encode_script, parse_script, render, CommandSound, JsonFileStore, MessageEntry, MessageScript,
    MoneyDirection, NotificationSink, NullSink, Participant, PlaybackScheduler, PlayerConfig,
    RenderOptions, Role, SessionBootstrap, SessionLoad, SessionStore, TerminalBell,
    TranscriptState,
};

/// Exit status when there is nothing to play and the authoring flow is needed
const REDIRECT_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "chat-replay")]
#[command(about = "Replay a scripted two-person chat in the terminal")]
pub struct Cli {
    /// Storage root (defaults to REPLAY_ROOT, the saved root, or ./chat_replay_data)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Session key the chat was saved under
    #[arg(short, long, global = true)]
    pub session: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Play the saved chat (default)
    Play(PlayArgs),
    /// Save a demo chat so there is something to play
    SeedDemo,
    /// Validate a chat file and list repaired entries
    Check { file: PathBuf },
    /// Show the storage root, or remember a new one
    Root { path: Option<PathBuf> },
}

#[derive(Args, Debug, Default, PartialEq)]
pub struct PlayArgs {
    /// Playback speed multiplier
    #[arg(long)]
    pub speed: Option<f64>,

    /// No notification sound
    #[arg(long)]
    pub mute: bool,

    /// Transcript width in columns
    #[arg(long)]
    pub width: Option<usize>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "player=debug,replay_core=debug,replay_common=debug,info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());

    // stdout belongs to the transcript
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = PlayerConfig::load().await.unwrap_or_else(|e| {
        warn!("Could not read player config ({}), using defaults", e);
        PlayerConfig::default()
    });
    if let Some(root) = cli.root {
        config.root = Some(root);
    }
    if let Some(session) = cli.session {
        config.session_key = session;
    }

    match cli.command.unwrap_or(Command::Play(PlayArgs::default())) {
        Command::Play(args) => play(&config, &args).await,
        Command::SeedDemo => seed_demo(&config).await,
        Command::Check { file } => check(&file).await,
        Command::Root { path } => root(path),
    }
}

async fn open_store(config: &PlayerConfig) -> anyhow::Result<JsonFileStore> {
    let root = replay_common::init_structure_in(&config.root())?;
    Ok(JsonFileStore::in_root(&root).await?)
}

fn pick_sink(config: &PlayerConfig, mute: bool) -> Arc<dyn NotificationSink> {
    if mute || !config.sound.enabled {
        return Arc::new(NullSink);
    }
    match CommandSound::from_command(&config.sound.command) {
        Some(sound) => Arc::new(sound),
        None => Arc::new(TerminalBell),
    }
}

fn draw(state: &TranscriptState, script: &MessageScript, options: &RenderOptions) {
    let transcript = render(state, script, options);
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "\x1b[2J\x1b[H{}", transcript);
    let _ = out.flush();
}

async fn play(config: &PlayerConfig, args: &PlayArgs) -> anyhow::Result<ExitCode> {
    let store = open_store(config).await?;
    let bootstrap = SessionBootstrap::new(Arc::new(store), config.session_key.as_str());

    let script = match bootstrap.load().await {
        SessionLoad::Ready { script, issues } => {
            if !issues.is_empty() {
                info!("{} entries were repaired while loading", issues.len());
            }
            script
        }
        SessionLoad::Redirect(invalid) => {
            eprintln!("Nothing to play for '{}': {}", invalid.key, invalid.reason);
            eprintln!("Create a chat first, e.g. `chat-replay seed-demo`.");
            return Ok(ExitCode::from(REDIRECT_EXIT));
        }
    };

    let timing = config.timing.scaled(args.speed.unwrap_or(1.0))?;
    let width = args.width.unwrap_or(config.width);
    let options = RenderOptions::with_offset_minutes(width, config.utc_offset_minutes);
    let scheduler = PlaybackScheduler::new(Arc::clone(&script), timing)?
        .with_sink(pick_sink(config, args.mute));

    let mut session = scheduler.start();
    draw(&session.snapshot(), &script, &options);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut interrupted = false;
    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(_) => draw(&session.snapshot(), &script, &options),
                None => break,
            },
            _ = &mut ctrl_c => {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        info!("Interrupted, stopping playback");
        session.teardown();
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

/// The chat `seed-demo` saves
pub fn demo_script() -> MessageScript {
    MessageScript::new(
        Participant::new("Ahmed", "https://i.pravatar.cc/150?img=12"),
        Participant::new("Fatima", "https://i.pravatar.cc/150?img=47"),
    )
    .with_entry(MessageEntry::text("1", Role::A, "Salam! How was your day?"))
    .with_entry(MessageEntry::text("2", Role::B, "Long, but good. You?"))
    .with_entry(MessageEntry::text("3", Role::A, "Better now. I have a surprise"))
    .with_entry(MessageEntry::money(
        "4",
        Role::A,
        100.0,
        "USD",
        MoneyDirection::Sent,
    ))
    .with_entry(MessageEntry::emoji("5", Role::B, "😘"))
    .with_entry(MessageEntry::image(
        "6",
        Role::B,
        "https://picsum.photos/seed/dinner/400/300",
    ))
    .with_entry(MessageEntry::text("7", Role::B, "Dinner tonight? My treat"))
    .with_entry(MessageEntry::money(
        "8",
        Role::B,
        25.0,
        "USD",
        MoneyDirection::Request,
    ))
    .with_entry(MessageEntry::emoji("9", Role::A, "🌹"))
}

async fn seed_demo(config: &PlayerConfig) -> anyhow::Result<ExitCode> {
    let store = open_store(config).await?;
    let record = encode_script(&demo_script())?;
    store.put(&config.session_key, &record).await?;

    println!(
        "Saved demo chat as '{}' in {}",
        config.session_key,
        store.dir().display()
    );
    Ok(ExitCode::SUCCESS)
}

async fn check(file: &Path) -> anyhow::Result<ExitCode> {
    let raw = tokio::fs::read_to_string(file).await?;
    match parse_script(&raw) {
        Ok(loaded) => {
            println!(
                "OK: {} and {}, {} entries",
                loaded.script.participant(Role::A).name,
                loaded.script.participant(Role::B).name,
                loaded.script.len()
            );
            for issue in &loaded.issues {
                println!("  repaired: {}", issue);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("Invalid chat: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn root(path: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    match path {
        Some(path) => {
            replay_common::save_persistent_root(path.clone())?;
            println!("Storage root set to {}", path.display());
        }
        None => println!("{}", replay_common::replay_root().display()),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_no_subcommand_means_play() {
        let cli = Cli::try_parse_from(["chat-replay"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_play_flags() {
        let cli = Cli::try_parse_from([
            "chat-replay",
            "--session",
            "date-night",
            "play",
            "--speed",
            "2",
            "--mute",
        ])
        .unwrap();
        assert_eq!(cli.session.as_deref(), Some("date-night"));
        assert_eq!(
            cli.command,
            Some(Command::Play(PlayArgs {
                speed: Some(2.0),
                mute: true,
                width: None,
            }))
        );
    }

    #[test]
    fn test_demo_script_loads_cleanly() {
        let record = encode_script(&demo_script()).unwrap();
        let loaded = parse_script(&record).unwrap();
        assert!(loaded.issues.is_empty());
        assert_eq!(loaded.script, demo_script());
    }

    #[tokio::test]
    async fn test_seed_then_play_finds_session() {
        let dir = tempdir().unwrap();
        let config = PlayerConfig {
            root: Some(dir.path().to_path_buf()),
            ..PlayerConfig::default()
        };

        assert_eq!(seed_demo(&config).await.unwrap(), ExitCode::SUCCESS);

        let store = open_store(&config).await.unwrap();
        let load = SessionBootstrap::new(Arc::new(store), "chatData").load().await;
        assert_eq!(load.script().map(|s| s.len()), Some(9));
    }

    #[tokio::test]
    async fn test_play_without_session_redirects() {
        let dir = tempdir().unwrap();
        let config = PlayerConfig {
            root: Some(dir.path().to_path_buf()),
            ..PlayerConfig::default()
        };
        let code = play(&config, &PlayArgs::default()).await.unwrap();
        assert_eq!(code, ExitCode::from(REDIRECT_EXIT));
    }

    #[tokio::test]
    async fn test_check_reports_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{ "entries": [] }"#).unwrap();
        assert_eq!(check(&path).await.unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn test_muted_config_uses_null_sink() {
        let mut config = PlayerConfig::default();
        config.sound.enabled = false;
        // Nothing observable beyond not panicking
        pick_sink(&config, false).notify();
        pick_sink(&PlayerConfig::default(), true).notify();
    }
}
