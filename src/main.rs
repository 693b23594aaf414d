//! feedmux: several independently paginated design feeds, one live list.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────────┐ Completion ┌──────────────┐ FeedEvent ┌──────────┐ draw() ┌────────┐
//! │   backends   │ ─────────► │  aggregator  │ ────────► │  app.rs  │ ─────► │ ui.rs  │
//! │ (tokio tasks)│  (channel) │ (pages, in-  │ (channel) │ (state)  │        │(render)│
//! └──────────────┘            │  flight)     │           └──────────┘        └────────┘
//!                             └──────────────┘                ▲
//!                                    ▲ toggles                │ handle_key_event()
//!                             ┌──────────────┐           ┌──────────┐
//!                             │   registry   │ ◄──────── │ input.rs │
//!                             └──────────────┘  Command  └──────────┘
//! ```
//!
//! * **`source/`**: the source model, the client traits and the concrete
//!   backends (Designer News, Product Hunt, Dribbble, RSS), plus the
//!   registry of configured sources.
//! * **`pagination`** / **`inflight`**: per-source page cursors and
//!   outstanding request handles.
//! * **`aggregator`**: dispatches page loads, applies completions, cancels.
//! * **`app`** / **`ui`** / **`input`**: state, rendering, key handling.
//! * **`config`** / **`cli`** / **`logging`**: the ambient setup.
//! * **`main`**: wires everything together and runs the event loop.

mod aggregator;
mod app;
mod cli;
mod config;
mod inflight;
mod input;
mod logging;
mod pagination;
mod source;
mod ui;

use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use aggregator::{Aggregator, Backends};
use app::{App, FilterView};
use cli::Args;
use config::Config;
use input::Command;
use source::{Source, SourceRegistry};

/// How long shutdown waits for cancelled requests to report back.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before printing a panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

fn filter_views(registry: &SourceRegistry, aggregator: &Aggregator) -> Vec<FilterView> {
    registry
        .filters()
        .into_iter()
        .map(|source| FilterView {
            loading: aggregator.is_loading(&source.key),
            pages: aggregator.cursor(&source.key),
            key: source.key,
            name: source.name,
            active: source.active,
        })
        .collect()
}

fn apply_filter_change(app: &mut App, aggregator: &mut Aggregator, source: &Source) {
    if !source.active {
        app.remove_source(&source.key);
        app.status = format!("{} off", source.name);
    } else {
        app.status = format!("{} on", source.name);
    }
    aggregator.on_filter_changed(source);
}

fn run_command(app: &mut App, aggregator: &mut Aggregator, command: Command) {
    match command {
        Command::ToggleSource(index) => {
            let Some(key) = app.filters.get(index).map(|f| f.key.clone()) else {
                return;
            };
            if let Err(err) = aggregator.registry().toggle(&key) {
                warn!(%key, error = %err, "toggle failed");
            }
        }
        Command::LoadMore => aggregator.load_all(),
        Command::CancelLoading => {
            let count = aggregator.in_flight();
            aggregator.cancel_loading();
            app.status = format!("Cancelled {count} requests");
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    install_panic_hook();

    // -- configuration -------------------------------------------------------
    let args = Args::parse();
    let config = Config::load(&args.config)?;
    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| config.logging.file.clone());
    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    logging::init(&log_file, &log_level)
        .with_context(|| format!("could not open log file {}", log_file.display()))?;

    let registry = config.registry(args.extra_sources())?;
    info!(sources = registry.len(), "sources configured");

    // -- aggregator ----------------------------------------------------------
    let runtime = tokio::runtime::Runtime::new().context("tokio runtime")?;
    let changes = Aggregator::filter_changes(&registry);
    let backends = Backends::connect(&config.http.settings(), &config.endpoints)?;
    let (event_tx, event_rx) = mpsc::channel();
    let mut aggregator =
        Aggregator::new(registry.clone(), backends, runtime.handle().clone(), event_tx);
    aggregator.load_all();

    // -- terminal setup (Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Apply source toggles and finished requests.
    //   2. Drain aggregator events into the app.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Toggles and completions
        while let Ok(source) = changes.try_recv() {
            apply_filter_change(&mut app, &mut aggregator, &source);
        }
        aggregator.poll_completions();

        // 2. Events
        while let Ok(event) = event_rx.try_recv() {
            app.apply(event);
        }
        app.filters = filter_views(&registry, &aggregator);

        // 3. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 4. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = input::handle_key_event(&mut app, key) {
                    run_command(&mut app, &mut aggregator, command);
                }
            }
        }

        if app.quit {
            break;
        }
    }

    // Let cancelled requests report back so nothing is left running.
    aggregator.cancel_loading();
    runtime.block_on(async {
        let drain = async { while aggregator.next_completion().await {} };
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, drain).await;
    });
    info!(outstanding = aggregator.outstanding(), "shutting down");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
