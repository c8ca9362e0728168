use crate::board::{render_html, Board};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::net::{HttpNetwork, Network};
use crate::poller::{Loader, Poller, RatesEvent, Transport};
use crate::ui;
use crate::worker::{self, CacheStorage, SqliteStorage, WorkerConfig, WorkerState};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type AppTransport = Transport<SqliteStorage, HttpNetwork>;
type AppPoller = Poller<SqliteStorage, HttpNetwork>;

/// Build the fetch layer. It can be used right away; when the cache
/// worker is enabled it registers in the background and takes over
/// once active.
fn connect(config: &Config) -> Result<(AppTransport, Option<JoinHandle<bool>>)> {
  let network = HttpNetwork::new(config.connect_timeout())?;
  let transport = Transport::direct(network.clone());

  if !config.worker.enabled {
    info!("cache worker disabled");
    return Ok((transport, None));
  }

  let worker_config = config.worker_config()?;
  let path = match &config.worker.database {
    Some(p) => p.clone(),
    None => SqliteStorage::default_path()?,
  };

  let storage = match SqliteStorage::open_at(&path) {
    Ok(s) => Arc::new(s),
    Err(e) => {
      warn!(error = %e, "cache store unavailable, using network only");
      return Ok((transport, None));
    }
  };

  let registration = spawn_registration(&transport, storage, network, worker_config);
  Ok((transport, Some(registration)))
}

fn spawn_registration<S, N>(
  transport: &Transport<S, N>,
  storage: Arc<S>,
  network: N,
  config: WorkerConfig,
) -> JoinHandle<bool>
where
  S: CacheStorage + 'static,
  N: Network + Clone + 'static,
{
  let transport = transport.clone();
  tokio::spawn(async move { attach_worker(&transport, storage, network, config).await })
}

/// Register a worker and attach it to `transport`. Failures are logged and
/// leave the transport on the network.
async fn attach_worker<S, N>(
  transport: &Transport<S, N>,
  storage: Arc<S>,
  network: N,
  config: WorkerConfig,
) -> bool
where
  S: CacheStorage,
  N: Network + Clone,
{
  match worker::register(storage, network, config).await {
    Ok(w) => {
      info!(cache = %w.cache_name(), "cache worker registered");
      transport.attach(Arc::new(w))
    }
    Err(e) => {
      warn!(error = %e, "cache worker registration failed, using network only");
      false
    }
  }
}

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  /// Header title
  title: String,

  /// What the screen shows
  board: Board,

  /// Fetch layer shared with the poller
  transport: AppTransport,

  /// Background worker registration, if one is running
  registration: Option<JoinHandle<bool>>,

  /// Write the board markup here after every applied load
  html_out: Option<PathBuf>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  /// Must be called inside the tokio runtime: worker registration is
  /// spawned from here.
  pub fn new(config: Config, html_out: Option<PathBuf>) -> Result<Self> {
    let (transport, registration) = connect(&config)?;
    let board = Board::new(config.display.locale);
    let title = config.display_title();

    Ok(Self {
      config,
      title,
      board,
      transport,
      registration,
      html_out,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    let endpoint = self.config.rates_url()?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));

    let loader = Loader::new(self.transport.clone(), endpoint, events.sender());
    let mut poller = Poller::new(loader, self.config.poll_interval());
    poller.start();

    // Main loop
    let result = loop {
      if self.should_quit {
        break Ok(());
      }

      // Draw UI
      if let Err(e) = terminal.draw(|frame| ui::draw(frame, self)) {
        break Err(e.into());
      }

      // Handle events
      match events.next().await {
        Some(event) => self.handle_event(event, &poller),
        None => break Ok(()),
      }
    };

    poller.stop();
    if let Some(registration) = self.registration.take() {
      registration.abort();
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  fn handle_event(&mut self, event: Event, poller: &AppPoller) {
    match event {
      Event::Key(key) => self.handle_key(key, poller),
      Event::Tick => {} // UI refresh happens automatically
      Event::Clock(now) => self.board.tick_clock(now),
      Event::Rates(rates) => self.apply_rates(&rates),
    }
  }

  fn handle_key(&mut self, key: KeyEvent, poller: &AppPoller) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      self.should_quit = true;
      return;
    }

    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
      KeyCode::Char('r') => poller.refresh(),
      _ => {}
    }
  }

  fn apply_rates(&mut self, event: &RatesEvent) {
    debug!(seq = event.seq(), "rates event");
    if event.apply_to(&mut self.board) {
      self.write_snapshot();
    }
  }

  fn write_snapshot(&self) {
    let Some(path) = &self.html_out else {
      return;
    };
    if let Err(e) = std::fs::write(path, render_html(&self.board)) {
      warn!(path = %path.display(), error = %e, "failed to write HTML snapshot");
    }
  }

  pub fn board(&self) -> &Board {
    &self.board
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn worker_state(&self) -> Option<WorkerState> {
    self.transport.worker().map(|w| w.state())
  }
}

/// Single forced load, markup printed to stdout.
pub async fn run_once(config: Config, html_out: Option<PathBuf>) -> Result<()> {
  let endpoint = config.rates_url()?;
  let (transport, registration) = connect(&config)?;

  // One load, so give a reused store the chance to serve it offline, but
  // never wait longer than a connection attempt would
  if let Some(registration) = registration {
    if tokio::time::timeout(config.connect_timeout(), registration)
      .await
      .is_err()
    {
      warn!("cache worker not ready, loading from the network");
    }
  }

  // Nothing listens to progress events in this mode
  let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
  let loader = Loader::new(transport, endpoint, tx);

  let mut board = Board::new(config.display.locale);
  board.tick_clock(chrono::Local::now());

  let event = loader.load_now(true).await;
  event.apply_to(&mut board);

  let markup = render_html(&board);
  if let Some(path) = &html_out {
    std::fs::write(path, &markup)
      .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
  }
  println!("{}", markup);

  Ok(())
}
