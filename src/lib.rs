//! Terminal "now playing" display for MPRIS media players.
//!
//! Album art is drawn with lower-half-block cells in 24-bit colour, two
//! pixel rows per terminal row, with the track's title, artist, album and
//! playback status printed alongside.

pub mod art;
pub mod canvas;
pub mod config;
pub mod driver;
pub mod error;
pub mod mpris;
pub mod queue;
pub mod snapshot;

pub use art::{ArtResolver, FileArtResolver};
pub use canvas::{render, scale_to_canvas, Bitmap};
pub use config::{CanvasConfig, Config, DriveMode};
pub use driver::{RenderDriver, StateSource, Terminal, TerminalSize};
pub use error::{DriverError, SourceError};
pub use snapshot::{PlaybackStatus, PlayerSnapshot, PlayerUpdate, Track};
