use std::{
    io::{self, BufWriter},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use futures::executor::block_on;
use now_playing_term::{
    config::{Config, DriveMode},
    driver::{RenderDriver, Terminal},
    error::DriverError,
    mpris::{self, MprisSource},
    queue, FileArtResolver,
};
use tracing::{info, warn};
use zbus::Connection;

/// Shows the current track of an MPRIS media player as half-block album art
/// and text in the terminal.
#[derive(Parser, Debug)]
#[command(name = "now_playing_term", version, about)]
struct Cli {
    /// Player bus name, or a short name such as `spotify`
    #[arg(short, long, env = "NOWPLAYING_PLAYER")]
    player: Option<String>,

    /// Album art pixel size; pins the canvas instead of fitting the terminal
    #[arg(short, long, env = "NOWPLAYING_ART")]
    art: Option<u32>,

    /// Keep the configured art size even when the terminal height is known
    #[arg(long)]
    no_fit: bool,

    /// What triggers a repaint
    #[arg(short, long, value_enum, env = "NOWPLAYING_MODE")]
    mode: Option<DriveMode>,

    /// Seconds between repaints in poll mode
    #[arg(short, long)]
    interval: Option<u64>,

    /// Pending notifications kept in watch mode
    #[arg(long)]
    queue: Option<usize>,

    /// Read settings from this file instead of the default locations
    #[arg(short, long, env = "NOWPLAYING_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Render once and exit
    #[arg(long)]
    once: bool,

    /// Print the MPRIS players on the session bus and exit
    #[arg(long)]
    list_players: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(player) = &self.player {
            config.player = player.clone();
        }
        if let Some(art) = self.art {
            config.canvas.art_size = art;
            config.canvas.fit_terminal = false;
        }
        if self.no_fit {
            config.canvas.fit_terminal = false;
        }
        if let Some(mode) = self.mode {
            config.driver.mode = mode;
        }
        if let Some(interval) = self.interval {
            config.driver.interval_secs = interval;
        }
        if let Some(capacity) = self.queue {
            config.driver.queue_capacity = capacity;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
    }
}

/// Logs go to stderr; stdout belongs to the canvas.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config);
    init_logging(&config.log.level);

    let connection =
        block_on(Connection::session()).context("Failed to connect to the session bus")?;

    if cli.list_players {
        for name in mpris::list_players(&connection).context("Failed to list players")? {
            println!("{name}");
        }
        return Ok(());
    }

    let bus_name = mpris::resolve_player(&connection, &config.player)
        .with_context(|| format!("Failed to find player `{}`", config.player))?;
    info!(player = %bus_name, mode = ?config.driver.mode, "observing media player");

    let mut source = MprisSource::connect(&connection, &bus_name)
        .with_context(|| format!("Failed to connect to {bus_name}"))?;
    let out = BufWriter::new(io::stdout().lock());
    let mut driver = RenderDriver::new(FileArtResolver, Terminal, out, config.canvas.clone());

    if cli.once {
        if !driver.tick(&mut source)? {
            anyhow::bail!("Player state unavailable from {bus_name}");
        }
        return Ok(());
    }

    match config.driver.mode {
        DriveMode::Poll => driver.run_timer(&mut source, config.driver.interval())?,
        DriveMode::Watch => {
            let (publisher, notifications) = queue::bounded(config.driver.queue_capacity());
            let listener = mpris::spawn_listener(&connection, &bus_name, publisher)
                .with_context(|| format!("Failed to subscribe to {bus_name}"))?;
            driver.tick(&mut source)?;
            let result = driver.run_events(&notifications);
            // The queue only disconnects once the listener has dropped its publisher.
            if matches!(result, Err(DriverError::SourceClosed)) && listener.join().is_err() {
                warn!("mpris listener thread panicked");
            }
            result?;
        }
    }

    Ok(())
}
