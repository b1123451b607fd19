//! Tetrixtui: falling-block puzzle in the terminal with a shared leaderboard.

mod app;
mod board;
mod catalog;
mod game;
mod highscores;
mod input;
mod piece;
mod progression;
mod remote;
mod server;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use catalog::Catalog;
use clap::{Parser, Subcommand};
use highscores::ScoreStore;
use remote::{HttpScoreService, OfflineScoreService, RemoteClient, ScoreService};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Engine options derived from the command line.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub seed: Option<u64>,
    pub autostart: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    if let Some(Command::Serve { addr, scores_file }) = &args.command {
        init_logging(None)?;
        return runtime.block_on(server::serve(*addr, ScoreStore::new(scores_file)));
    }

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| highscores::config_dir().join("tetrixtui.log"));
    init_logging(Some(&log_file))?;

    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_else(|err| {
        tracing::warn!(%err, "theme not loaded, using defaults");
        theme::Theme::default()
    });
    let local_catalog = args
        .catalog
        .as_deref()
        .map(Catalog::from_file)
        .transpose()
        .context("reading --catalog")?;

    let service: Arc<dyn ScoreService> = if args.offline {
        let store = ScoreStore::new(
            args.scores_file
                .clone()
                .unwrap_or_else(ScoreStore::default_path),
        );
        tracing::info!(scores = %store.path().display(), "offline mode");
        Arc::new(OfflineScoreService::new(
            local_catalog.unwrap_or_else(Catalog::builtin),
            store,
        ))
    } else {
        let mut http = HttpScoreService::new(&args.server)?;
        if let Some(catalog) = local_catalog {
            http = http.with_catalog(catalog);
        }
        tracing::info!(server = %args.server, "using score service");
        Arc::new(http)
    };

    let config = GameConfig {
        width: args.width.max(4),
        height: args.height.max(4),
        seed: args.seed,
        autostart: args.autostart,
    };
    let remote = RemoteClient::new(service, runtime.handle().clone());
    let mut app = App::new(&args, config, theme, remote);
    app.run()
}

/// `RUST_LOG` wins; otherwise `info`. The game writes to a file because the
/// terminal belongs to the renderer.
fn init_logging(file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
    }
    Ok(())
}

/// Falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tetrixtui",
    version,
    about = "Falling-block puzzle in the terminal with a shared leaderboard.",
    long_about = "Tetrixtui is a terminal falling-block puzzle.\n\n\
        Steer falling pieces, complete horizontal rows to clear them, and submit your \
        score to the leaderboard when the stack reaches the top. Pieces and scores come \
        from a score service (run one with `tetrixtui serve`) or, with --offline, from \
        this machine.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Up        Rotate     Down       Soft drop\n  Space       Hard drop   P          Pause      S / Enter  Start\n  R           Reset       Q / Esc    Quit\n\n\
        CONTROLS (vim):\n  h/l         Move    k          Rotate     j          Soft drop\n\n\
        GAME OVER:\n  Type a name, Enter to save, Tab to play again, Esc to quit."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Base URL of the score service.
    #[arg(long, default_value = "http://127.0.0.1:5000", value_name = "URL")]
    pub server: String,

    /// Play without a score service: built-in pieces and a local scores file.
    #[arg(long)]
    pub offline: bool,

    /// Load the piece catalog from a JSON file instead of the service.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Scores file for --offline. Defaults to the config directory.
    #[arg(long, value_name = "FILE")]
    pub scores_file: Option<PathBuf>,

    /// Playfield width in columns.
    #[arg(long, default_value = "10", value_name = "COLS")]
    pub width: u16,

    /// Playfield height in rows.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: u16,

    /// Seed for piece selection (same seed, same pieces).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Start playing as soon as the pieces are loaded instead of waiting for S.
    #[arg(long)]
    pub autostart: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Disable line-clear animation.
    #[arg(long)]
    pub no_animation: bool,

    /// Log file. Defaults to tetrixtui.log in the config directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the score service: piece catalog and leaderboard over HTTP.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,

        /// JSON file holding every submitted score.
        #[arg(long, default_value = "scores.json", value_name = "FILE")]
        scores_file: PathBuf,
    },
}
