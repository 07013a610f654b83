use std::{io::Write, thread, time::Duration};

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::{
    art::ArtResolver,
    canvas,
    config::CanvasConfig,
    error::{DriverError, SourceError},
    mpris::PropertiesChange,
    snapshot::{PlayerSnapshot, PlayerUpdate},
};

/// Something that can be asked for the player's complete current state.
pub trait StateSource {
    fn snapshot(&mut self) -> Result<PlayerUpdate, SourceError>;
}

/// Reports the terminal height in character rows, if it can be read.
pub trait TerminalSize {
    fn rows(&self) -> Option<u16>;
}

/// The process's controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal;

impl TerminalSize for Terminal {
    fn rows(&self) -> Option<u16> {
        crossterm::terminal::size().ok().map(|(_, rows)| rows)
    }
}

pub type Notification = Result<PropertiesChange, SourceError>;

/// Owns the displayed snapshot and decides when it gets repainted.
pub struct RenderDriver<R, T, W> {
    snapshot: PlayerSnapshot,
    resolver: R,
    terminal: T,
    out: W,
    canvas: CanvasConfig,
}

impl<R, T, W> RenderDriver<R, T, W>
where
    R: ArtResolver,
    T: TerminalSize,
    W: Write,
{
    pub fn new(resolver: R, terminal: T, out: W, canvas: CanvasConfig) -> Self {
        Self {
            snapshot: PlayerSnapshot::default(),
            resolver,
            terminal,
            out,
            canvas,
        }
    }

    pub fn snapshot(&self) -> &PlayerSnapshot {
        &self.snapshot
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Canvas edge length in pixels for the next render.
    pub fn canvas_size(&self) -> u32 {
        if self.canvas.fit_terminal {
            if let Some(rows) = self.terminal.rows().filter(|rows| *rows > 0) {
                return u32::from(rows) * 2;
            }
        }
        self.canvas.art_size()
    }

    pub fn render(&mut self) -> Result<(), DriverError> {
        let size = self.canvas_size();
        debug!(size, title = %self.snapshot.title, "rendering");
        canvas::render(&mut self.out, &self.snapshot, size)?;
        Ok(())
    }

    /// One timer cycle: pull, replace, render. A failed pull skips the render.
    pub fn tick<S: StateSource + ?Sized>(&mut self, source: &mut S) -> Result<bool, DriverError> {
        match source.snapshot() {
            Ok(update) => {
                self.snapshot = PlayerSnapshot::from_update(update, &self.resolver);
                self.render()?;
                Ok(true)
            }
            Err(err) => {
                warn!("skipping render, player state unavailable: {err}");
                Ok(false)
            }
        }
    }

    /// One event cycle: merge the notified fields, render.
    pub fn handle(&mut self, notification: Notification) -> Result<bool, DriverError> {
        let update = match notification.and_then(PropertiesChange::into_update) {
            Ok(update) => update,
            Err(err @ SourceError::UnexpectedInterface(_)) => {
                return Err(DriverError::Protocol(err));
            }
            Err(err) => {
                warn!("ignoring player notification: {err}");
                return Ok(false);
            }
        };
        if update.is_empty() {
            debug!("notification carried no displayed fields");
            return Ok(false);
        }
        self.snapshot.merge(update, &self.resolver);
        self.render()?;
        Ok(true)
    }

    /// Renders every `period`, forever. Returns only on a fatal error.
    pub fn run_timer<S: StateSource + ?Sized>(
        &mut self,
        source: &mut S,
        period: Duration,
    ) -> Result<(), DriverError> {
        info!(period_secs = period.as_secs(), "polling player state");
        loop {
            self.tick(source)?;
            thread::sleep(period);
        }
    }

    /// Renders on each notification until the listener goes away.
    pub fn run_events(&mut self, notifications: &Receiver<Notification>) -> Result<(), DriverError> {
        info!("waiting for player notifications");
        while let Ok(notification) = notifications.recv() {
            self.handle(notification)?;
        }
        Err(DriverError::SourceClosed)
    }
}
