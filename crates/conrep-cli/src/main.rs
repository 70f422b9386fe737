//! `conrep`: terminal UI for the condition repository.
//!
//! # Usage
//!
//! ```
//! conrep --url http://localhost:5000 --token <bearer>
//! conrep --config ~/.config/conrep/config.toml --log-file /tmp/conrep.log
//! ```

mod app;
mod client;
mod editor;
mod ui;


use std::{
  fs::OpenOptions,
  io,
  path::PathBuf,
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "conrep", version, about = "Terminal UI for the condition repository")]
struct Args {
  /// Path to a TOML config file (base_url, token, log_file).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the condition repository (default: http://localhost:5000).
  #[arg(long, env = "CONREP_URL")]
  url: Option<String>,

  /// Bearer token sent with every request.
  #[arg(long, env = "CONREP_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Append logs to this file. The terminal itself is never logged to.
  #[arg(long, env = "CONREP_LOG_FILE", value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Settings read from the config file and `CONREP_*` variables.
#[derive(Deserialize, Debug)]
struct Settings {
  #[serde(default = "default_base_url")]
  base_url: String,
  #[serde(default)]
  token:    Option<String>,
  #[serde(default)]
  log_file: Option<PathBuf>,
}

fn default_base_url() -> String { "http://localhost:5000".to_string() }

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
  let mut builder = config::Config::builder();
  if let Some(path) = path {
    builder = builder.add_source(config::File::from(path.as_path()).required(true));
  }
  builder
    .add_source(config::Environment::with_prefix("CONREP"))
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("failed to deserialise configuration")
}

/// Log to `path` when set. Without a log file nothing is collected, since
/// stdout belongs to the terminal UI.
fn init_tracing(path: Option<&PathBuf>) -> Result<()> {
  let Some(path) = path else {
    return Ok(());
  };
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let settings = load_settings(args.config.as_ref())?;

  // CLI flags override config file and environment, which override defaults.
  let log_file = args.log_file.or(settings.log_file);
  init_tracing(log_file.as_ref())?;

  let api_config = ApiConfig {
    base_url: args.url.unwrap_or(settings.base_url),
    token:    args.token.or(settings.token).filter(|t| !t.is_empty()),
  };
  tracing::info!(base_url = %api_config.base_url, "starting conrep");

  let client = ApiClient::new(api_config)?;
  let mut app = App::new(client);

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  app.load_projects().await;

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<ApiClient>,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event {
      if !app.handle_key(key).await? {
        break;
      }
    }
  }

  Ok(())
}
