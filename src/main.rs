mod app;
mod board;
mod config;
mod event;
mod net;
mod poller;
mod rates;
mod ui;
mod worker;

use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ratemon")]
#[command(about = "An offline-capable terminal monitor for exchange rates")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ratemon/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the rates server (overrides server.url)
  #[arg(short, long)]
  url: Option<String>,

  /// Talk to the network directly, without the offline cache
  #[arg(long)]
  no_worker: bool,

  /// Write the board as HTML to this file after every load
  #[arg(long, value_name = "PATH")]
  html: Option<PathBuf>,

  /// Load once, print the HTML board to stdout and exit
  #[arg(long)]
  once: bool,
}

/// Set up logging. The TUI owns the terminal, so it logs to a daily file;
/// one-shot mode logs to stderr.
fn init_tracing(to_file: bool) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ratemon=info"));

  if !to_file {
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .init();
    return Ok(None);
  }

  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("ratemon")
    .join("logs");

  let appender = tracing_appender::rolling::daily(log_dir, "ratemon.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing(!args.once)?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line overrides
  if let Some(url) = args.url {
    config.server.url = Some(url);
  }
  if args.no_worker {
    config.worker.enabled = false;
  }

  if args.once {
    return app::run_once(config, args.html).await;
  }

  // Initialize and run the app
  let mut app = app::App::new(config, args.html)?;
  app.run().await?;

  Ok(())
}
