use tracing::debug;

use crate::{art::ArtResolver, canvas::Bitmap};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
    #[default]
    Unknown,
}

impl PlaybackStatus {
    /// Parses the MPRIS `PlaybackStatus` text. Anything unrecognised is `Unknown`.
    pub fn from_mpris(value: &str) -> Self {
        match value {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            "Stopped" => PlaybackStatus::Stopped,
            _ => PlaybackStatus::Unknown,
        }
    }

    pub fn glyph(self) -> Option<&'static str> {
        match self {
            PlaybackStatus::Playing => Some("▶"),
            PlaybackStatus::Paused => Some("⏸"),
            PlaybackStatus::Stopped => Some("⏹"),
            PlaybackStatus::Unknown => None,
        }
    }
}

/// The track fields of one state sample. They always travel together: a
/// player announces a new track by resending all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub art_url: Option<String>,
}

/// One state sample or change notification.
///
/// `None` means that part was not in the sample, not that it is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerUpdate {
    pub track: Option<Track>,
    pub status: Option<PlaybackStatus>,
}

impl PlayerUpdate {
    pub fn is_empty(&self) -> bool {
        self.track.is_none() && self.status.is_none()
    }
}

/// Everything currently known about the player, as consumed by one render.
#[derive(Clone, Debug, Default)]
pub struct PlayerSnapshot {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub status: PlaybackStatus,
    pub art_url: Option<String>,
    pub art: Option<Bitmap>,
}

impl PlayerSnapshot {
    /// Builds a snapshot from a full sample, discarding anything held before.
    pub fn from_update<R: ArtResolver + ?Sized>(update: PlayerUpdate, resolver: &R) -> Self {
        let mut snapshot = Self::default();
        snapshot.merge(update, resolver);
        snapshot
    }

    /// Applies the parts present in `update`. A track replaces every track
    /// field, including the art; status is left alone unless sent.
    pub fn merge<R: ArtResolver + ?Sized>(&mut self, update: PlayerUpdate, resolver: &R) {
        if let Some(track) = update.track {
            self.title = track.title;
            self.artist = track.artist;
            self.album = track.album;
            self.set_art(track.art_url, resolver);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }

    fn set_art<R: ArtResolver + ?Sized>(&mut self, art_url: Option<String>, resolver: &R) {
        if art_url.is_some() && art_url == self.art_url && self.art.is_some() {
            debug!(url = ?art_url, "album art unchanged, keeping decoded bitmap");
            return;
        }
        self.art = art_url.as_deref().and_then(|url| resolver.resolve(url));
        self.art_url = art_url;
    }
}

impl PartialEq for PlayerSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.artist == other.artist
            && self.album == other.album
            && self.status == other.status
            && self.art_url == other.art_url
            && self.art.as_ref().map(|art| art.as_raw())
                == other.art.as_ref().map(|art| art.as_raw())
    }
}
