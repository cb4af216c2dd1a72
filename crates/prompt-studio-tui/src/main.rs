use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use prompt_studio_core::{Config, EchoGenerator, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod input;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "prompt_studio=info,prompt_studio_core=info";

#[derive(Parser)]
#[command(name = "prompt-studio")]
#[command(version, about = "Configure a prompt and run a simulated conversation")]
struct Cli {
    /// Config file with startup defaults (default: <config dir>/prompt-studio/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Import a JSON settings file at startup
    #[arg(short, long)]
    import: Option<PathBuf>,

    /// Where to write diagnostic logs (default: <cache dir>/prompt-studio/prompt-studio.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to a file; the terminal belongs to the UI
    let log_path = init_logging(cli.log_file.clone());
    info!(version = env!("CARGO_PKG_VERSION"), log = ?log_path, "starting prompt-studio");

    // An explicit --config must load; the default location is best effort
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable config");
            Config::new()
        }),
    };

    let session = Session::with_form(config.initial_form(), EchoGenerator);
    let mut events = EventHandler::new();
    let mut app = App::new(session, events.sender());

    if let Some(path) = cli.import {
        app.start_import(path);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!(turns = app.session.log().len(), "exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("prompt-studio").join("prompt-studio.log"))
}

/// Install a file-backed subscriber. Returns the log path, or `None` when
/// logging is disabled because the file couldn't be opened.
fn init_logging(path: Option<PathBuf>) -> Option<PathBuf> {
    let path = path.or_else(default_log_path)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Some(path)
}
