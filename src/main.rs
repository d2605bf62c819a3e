mod app;
mod collectors;
mod config;
mod filter;
mod history;
mod input;
mod models;
mod scheduler;
mod ui;
mod util;
mod view_model;

use anyhow::Result;
use app::App;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use collectors::command::{CancelToken, SystemRunner};
use collectors::{CollectError, Collection, Collector, ZfsCollector};
use config::{Config, ConfigError, Overrides, Settings};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use scheduler::Scheduler;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use view_model::Selection;

const EXIT_FATAL:       u8 = 1;
const EXIT_CONFIG:      u8 = 2;
const EXIT_UNAVAILABLE: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "zdash", about = "Terminal dashboard for ZFS pools and datasets", version)]
struct Cli {
    /// Refresh interval in seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Only show the pool with exactly this name
    #[arg(short, long)]
    pool: Option<String>,

    /// Only show datasets whose full path matches this regex
    #[arg(short, long)]
    dataset: Option<String>,

    /// Color theme: default, dracula, gruvbox, nord
    #[arg(short = 't', long)]
    theme: Option<String>,

    /// I/O samples kept per pool and vdev
    #[arg(long)]
    history: Option<usize>,

    /// Print one JSON snapshot of the filtered collection and exit
    #[arg(long)]
    json: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Print the config file path and resolved values, then exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            interval_secs: self.interval,
            pool:          self.pool.clone(),
            dataset:       self.dataset.clone(),
            theme:         self.theme.clone(),
            history:       self.history,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "zdash", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    // Held until exit so buffered log lines are flushed.
    let _guard = setup_tracing();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "configuration rejected");
            eprintln!("zdash: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if cli.print_config {
        return exit_with(print_config(&settings));
    }

    let collector: Arc<dyn Collector> =
        Arc::new(ZfsCollector::new(SystemRunner, settings.zpool.clone(), settings.zfs.clone()));

    info!(interval = ?settings.interval, "initial poll");
    let first = collector.collect(&CancelToken::new());
    if let Err(e @ CollectError::ToolUnavailable { .. }) = &first {
        error!(error = %e, "startup poll failed");
        eprintln!("zdash: {e}");
        return ExitCode::from(EXIT_UNAVAILABLE);
    }

    if cli.json {
        return exit_with(first.map_err(anyhow::Error::from).and_then(|c| print_json(&settings, &c)));
    }

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        // A collector thread panicking is reported in the banner; the UI keeps the terminal.
        if std::thread::current().name() != Some("main") {
            error!(panic = %info, "worker thread panicked");
            return;
        }
        let _ = restore_terminal();
        original_hook(info);
    }));

    let mut scheduler = Scheduler::new(
        collector,
        settings.filters.clone(),
        settings.interval,
        settings.history_capacity,
    );
    scheduler.seed(first, &Selection::default());

    let result = run(scheduler, &settings);
    let restored = restore_terminal();
    exit_with(result.and(restored))
}

fn exit_with(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("zdash: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let file = Config::load()?;
    Settings::resolve(&file, &cli.overrides())
}

// ── Logging ───────────────────────────────────────────────────────────

fn log_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("zdash")
}

/// File-only tracing; the terminal belongs to the dashboard.
fn setup_tracing() -> Option<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir).ok()?;

    let filter = EnvFilter::try_from_env("ZDASH_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::never(&dir, "zdash.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .ok()?;

    Some(guard)
}

// ── One-shot modes ────────────────────────────────────────────────────

fn print_config(settings: &Settings) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no config directory)".to_string());
    println!("# Config: {path}");
    println!("# Log:    {}", log_dir().join("zdash.log").display());
    if let Some(pool) = &settings.filters.pool {
        println!("# Pool filter:    {pool}");
    }
    if let Some(re) = &settings.filters.dataset {
        println!("# Dataset filter: {}", re.as_str());
    }
    print!("{}", toml::to_string_pretty(&settings.as_config())?);
    Ok(())
}

fn print_json(settings: &Settings, collection: &Collection) -> Result<()> {
    use serde_json::json;

    let view = settings.filters.apply(&collection.pools);
    let snapshot = json!({
        "zdash_version": env!("CARGO_PKG_VERSION"),
        "collected_at":  collection.collected_at.to_rfc3339(),
        "pools":         view.pools,
        "incomplete":    collection.incomplete,
        "warnings":      collection.warnings,
    });

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

// ── Terminal ──────────────────────────────────────────────────────────

fn run(scheduler: Scheduler, settings: &Settings) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;

    let mut app = App::new(scheduler, settings.theme);
    app.run(&mut term)?;

    info!("clean shutdown");
    Ok(())
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}
