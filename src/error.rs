use std::io;

use thiserror::Error;

/// Failures while talking to the observed media player.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("malformed player state: {0}")]
    Malformed(String),

    #[error("unexpected property interface `{0}`")]
    UnexpectedInterface(String),

    #[error("no MPRIS player matches `{0}`")]
    PlayerNotFound(String),

    #[error("failed to start the notification listener: {0}")]
    Listener(#[from] io::Error),
}

impl From<zbus::fdo::Error> for SourceError {
    fn from(value: zbus::fdo::Error) -> Self {
        SourceError::Bus(value.into())
    }
}

impl From<zbus::zvariant::Error> for SourceError {
    fn from(value: zbus::zvariant::Error) -> Self {
        SourceError::Malformed(value.to_string())
    }
}

/// Failures that end a render driver loop.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to write to the terminal: {0}")]
    Output(#[from] io::Error),

    #[error("player protocol mismatch: {0}")]
    Protocol(SourceError),

    #[error("player notification stream closed")]
    SourceClosed,
}
