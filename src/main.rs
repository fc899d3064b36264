//! IronSight command-line front end
//!
//! Drives the rate sampler and the connection monitor against the Win32
//! sources and prints their output as tables or JSON.
//!
//! Watch controls:
//! - q / Esc / Ctrl-C: Quit
//! - [: Slow down refresh rate
//! - ]: Speed up refresh rate

#![cfg_attr(not(windows), allow(dead_code, unused_imports))]

mod cli;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen},
};
use serde::Serialize;
use tracing::{debug, info};

use cli::{Args, Commands};
use ironsight_sampler::constants::{DEFAULT_CONFIG_FILE, MIN_REFRESH_MS};
use ironsight_sampler::network::ConnectionTableSource;
use ironsight_sampler::system::SystemTickClock;
use ironsight_sampler::{
    ConnectionMonitor, PollingService, ProcessSource, RateSampler, SamplerConfig, Subscription,
    TickClock,
};

/// How long the watch loop waits for a key before checking for new polls
const INPUT_POLL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    let mut config =
        SamplerConfig::load_or_default(args.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
            .context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;
    debug!(?config, "effective configuration");

    if let Commands::Config = args.command {
        let toml = config
            .to_toml_string()
            .context("Failed to serialize configuration")?;
        print!("{}", toml);
        return Ok(());
    }

    run_platform(&args, config)
}

/// Installs the stderr fmt subscriber. `--log-level off` installs nothing.
fn setup_logging(args: &Args) {
    let Some(level) = args.log_level.as_level() else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a tracing subscriber was already installed");
        return;
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

#[cfg(windows)]
fn run_platform(args: &Args, config: SamplerConfig) -> Result<()> {
    use ironsight_sampler::system::{Win32ConnectionTable, Win32ProcessSource};

    run(
        args,
        config,
        Win32ProcessSource::new(),
        Win32ConnectionTable::new(),
    )
}

#[cfg(not(windows))]
fn run_platform(_args: &Args, _config: SamplerConfig) -> Result<()> {
    anyhow::bail!("unsupported platform: process and connection sampling requires Windows")
}

fn run<S, T>(args: &Args, config: SamplerConfig, source: S, table: T) -> Result<()>
where
    S: ProcessSource + Send + Sync + 'static,
    T: ConnectionTableSource,
{
    let sampler = RateSampler::new(source, SystemTickClock::new(), config);

    match &args.command {
        Commands::Sample { json, .. } => cmd_sample(&sampler, *json),
        Commands::Top { json, .. } => cmd_top(&sampler, *json),
        Commands::Connections {
            tcp,
            udp,
            limit,
            json,
        } => cmd_connections(table, *tcp, *udp, *limit, *json),
        Commands::Watch { .. } => cmd_watch(Arc::new(sampler)),
        Commands::Config => Ok(()),
    }
}

fn print_json<V: Serialize>(value: &V) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Polls twice so the printed rates cover one full interval.
fn cmd_sample<S: ProcessSource>(
    sampler: &RateSampler<S, SystemTickClock>,
    json: bool,
) -> Result<()> {
    let max_entries = sampler.config().enumeration_capacity;
    let interval = Duration::from_millis(sampler.config().refresh_interval_ms);

    sampler
        .sample(max_entries)
        .context("Failed to take baseline sample")?;
    thread::sleep(interval);
    let metrics = sampler
        .sample(max_entries)
        .context("Failed to sample processes")?;
    info!(processes = metrics.len(), "sample complete");

    if json {
        return print_json(&metrics);
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    ui::write_metrics(&mut out, &metrics)?;
    out.flush()?;
    Ok(())
}

fn cmd_top<S: ProcessSource>(sampler: &RateSampler<S, SystemTickClock>, json: bool) -> Result<()> {
    let consumers = sampler
        .top_consumers(sampler.config().top_consumers)
        .context("Failed to query memory consumers")?;

    if json {
        return print_json(&consumers);
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    ui::write_consumers(&mut out, &consumers)?;
    out.flush()?;
    Ok(())
}

fn cmd_connections<T: ConnectionTableSource>(
    table: T,
    tcp: bool,
    udp: bool,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let monitor = ConnectionMonitor::new(table);
    let refreshed = if tcp {
        monitor.refresh_tcp()
    } else if udp {
        monitor.refresh_udp()
    } else {
        monitor.refresh()
    };
    refreshed.context("Failed to read connection tables")?;

    let rows = match limit {
        Some(max) => monitor.copy_connections(max),
        None => monitor.connections(),
    };
    info!(
        total = monitor.connection_count(),
        shown = rows.len(),
        "connection tables read"
    );

    if json {
        return print_json(&rows);
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    ui::write_connections(&mut out, &rows)?;
    out.flush()?;
    Ok(())
}

fn cmd_watch<S>(sampler: Arc<RateSampler<S, SystemTickClock>>) -> Result<()>
where
    S: ProcessSource + Send + Sync + 'static,
{
    let interval_ms = sampler.config().refresh_interval_ms;
    let mut service = PollingService::new(sampler, interval_ms);
    let subscription = service.subscribe();
    service
        .start()
        .context("Failed to start polling thread")?;

    let mut stdout = io::stdout();

    // Set up terminal
    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen, DisableLineWrap, Hide)?;

    let result = watch_loop(&mut stdout, &service, &subscription);

    // Restore terminal
    execute!(stdout, Show, EnableLineWrap, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    service.stop();
    result
}

fn watch_loop<S, C>(
    stdout: &mut io::Stdout,
    service: &PollingService<S, C>,
    subscription: &Subscription,
) -> Result<()>
where
    S: ProcessSource + Send + Sync + 'static,
    C: TickClock + Send + Sync + 'static,
{
    let mut view = ui::LiveView::new(service.interval_ms());
    let mut dirty = true;

    loop {
        while let Ok(event) = subscription.try_recv() {
            view.apply(event);
            dirty = true;
        }

        if dirty {
            ui::render(stdout, &view)?;
            dirty = false;
        }

        if !event::poll(INPUT_POLL)? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(())
                }
                KeyCode::Char('[') => {
                    view.interval_ms = service.set_interval(view.interval_ms + MIN_REFRESH_MS);
                    dirty = true;
                }
                KeyCode::Char(']') => {
                    view.interval_ms =
                        service.set_interval(view.interval_ms.saturating_sub(MIN_REFRESH_MS));
                    dirty = true;
                }
                _ => {}
            },
            Event::Resize(_, _) => dirty = true,
            _ => {}
        }
    }
}
