//! MPRIS access over the D-Bus session bus.
//!
//! Property bags arrive as loosely typed `zvariant` maps; they are narrowed
//! here into [`PropertiesChange`] and [`PlayerUpdate`] so nothing past this
//! module handles raw variants.

use std::{
    collections::HashMap,
    future::IntoFuture,
    thread::{self, JoinHandle},
};

use futures::{executor::block_on, StreamExt};
use tracing::{debug, warn};
use zbus::{
    fdo::{DBusProxy, PropertiesChanged, PropertiesProxy},
    proxy,
    proxy::CacheProperties,
    zvariant::{self, OwnedValue, Value},
    Connection,
};

use crate::{
    driver::StateSource,
    error::SourceError,
    queue::Publisher,
    snapshot::{PlaybackStatus, PlayerUpdate, Track},
};

pub const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
pub const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait Player {
    /// "Playing", "Paused" or "Stopped"
    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

/// The subset of `Metadata` entries the display uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub artists: Option<Vec<String>>,
    pub album: Option<String>,
    pub art_url: Option<String>,
}

impl Metadata {
    pub fn from_map(map: &HashMap<String, OwnedValue>) -> Result<Self, SourceError> {
        Ok(Self {
            title: field(map, "xesam:title")?,
            artists: artists(map)?,
            album: field(map, "xesam:album")?,
            art_url: field(map, "mpris:artUrl")?,
        })
    }

    fn from_value(value: &OwnedValue) -> Result<Self, SourceError> {
        let value = peel(Value::from(value.try_clone()?));
        let map = HashMap::<String, OwnedValue>::try_from(value)
            .map_err(|err| SourceError::Malformed(format!("Metadata: {err}")))?;
        Self::from_map(&map)
    }

    /// The whole map describes one track: keys it lacks become empty.
    /// Only the first artist is shown.
    pub fn into_track(self) -> Track {
        Track {
            title: self.title.unwrap_or_default(),
            artist: self
                .artists
                .and_then(|artists| artists.into_iter().next())
                .unwrap_or_default(),
            album: self.album.unwrap_or_default(),
            art_url: self.art_url,
        }
    }
}

/// One `PropertiesChanged` notification, narrowed to the fields the display uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesChange {
    pub interface: String,
    pub playback_status: Option<String>,
    pub metadata: Option<Metadata>,
}

impl PropertiesChange {
    pub fn from_properties(
        interface: impl Into<String>,
        properties: &HashMap<String, OwnedValue>,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            interface: interface.into(),
            playback_status: field(properties, "PlaybackStatus")?,
            metadata: properties
                .get("Metadata")
                .map(Metadata::from_value)
                .transpose()?,
        })
    }

    /// Rejects bundles that don't belong to the player interface.
    pub fn into_update(self) -> Result<PlayerUpdate, SourceError> {
        if self.interface != PLAYER_INTERFACE {
            return Err(SourceError::UnexpectedInterface(self.interface));
        }
        Ok(PlayerUpdate {
            track: self.metadata.map(Metadata::into_track),
            status: self
                .playback_status
                .as_deref()
                .map(PlaybackStatus::from_mpris),
        })
    }
}

fn peel(value: Value<'static>) -> Value<'static> {
    match value {
        Value::Value(inner) => peel(*inner),
        other => other,
    }
}

fn field<T>(map: &HashMap<String, OwnedValue>, key: &str) -> Result<Option<T>, SourceError>
where
    T: TryFrom<Value<'static>>,
    T::Error: Into<zvariant::Error>,
{
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    let value = peel(Value::from(value.try_clone()?));
    T::try_from(value).map(Some).map_err(|err| {
        let err: zvariant::Error = err.into();
        SourceError::Malformed(format!("{key}: {err}"))
    })
}

/// `xesam:artist` is a string list, but some players send a bare string.
fn artists(map: &HashMap<String, OwnedValue>) -> Result<Option<Vec<String>>, SourceError> {
    match field::<Vec<String>>(map, "xesam:artist") {
        Ok(artists) => Ok(artists),
        Err(_) => Ok(field::<String>(map, "xesam:artist")?.map(|artist| vec![artist])),
    }
}

fn block_on_call<F, T>(call: F) -> T
where
    F: IntoFuture<Output = T>,
{
    block_on(call.into_future())
}

/// Pull access to one player's state.
pub struct MprisSource {
    proxy: PlayerProxy<'static>,
}

impl MprisSource {
    pub fn connect(connection: &Connection, bus_name: &str) -> Result<Self, SourceError> {
        let proxy = block_on_call(
            PlayerProxy::builder(connection)
                .destination(bus_name.to_owned())?
                .cache_properties(CacheProperties::No)
                .build(),
        )?;
        Ok(Self { proxy })
    }
}

impl StateSource for MprisSource {
    fn snapshot(&mut self) -> Result<PlayerUpdate, SourceError> {
        let metadata = block_on_call(self.proxy.metadata())?;
        let track = Metadata::from_map(&metadata)?.into_track();
        let status = match block_on_call(self.proxy.playback_status()) {
            Ok(status) => PlaybackStatus::from_mpris(&status),
            Err(err) => {
                debug!("PlaybackStatus unavailable: {err}");
                PlaybackStatus::Unknown
            }
        };
        Ok(PlayerUpdate {
            track: Some(track),
            status: Some(status),
        })
    }
}

fn properties_change(signal: &PropertiesChanged) -> Result<PropertiesChange, SourceError> {
    let args = signal.args()?;
    let mut properties = HashMap::new();
    for (name, value) in args.changed_properties() {
        properties.insert((*name).to_owned(), value.try_to_owned()?);
    }
    PropertiesChange::from_properties(args.interface_name().to_string(), &properties)
}

/// Subscribes to the player's property changes and forwards them from a
/// background thread. Subscription errors are returned before the thread
/// starts; the queue disconnects once the signal stream ends.
pub fn spawn_listener(
    connection: &Connection,
    bus_name: &str,
    publisher: Publisher<Result<PropertiesChange, SourceError>>,
) -> Result<JoinHandle<()>, SourceError> {
    let proxy = block_on_call(
        PropertiesProxy::builder(connection)
            .destination(bus_name.to_owned())?
            .path(MPRIS_PATH)?
            .build(),
    )?;
    let mut changes = block_on_call(
        proxy.receive_properties_changed_with_args(&[(0, PLAYER_INTERFACE)]),
    )?;

    let handle = thread::Builder::new()
        .name("mpris-listener".into())
        .spawn(move || {
            block_on(async {
                while let Some(signal) = changes.next().await {
                    let dropped = publisher.publish(properties_change(&signal));
                    if dropped > 0 {
                        debug!(dropped, "notification queue overflowed");
                    }
                }
            });
            warn!("player property stream ended");
        })?;
    Ok(handle)
}

/// MPRIS bus names currently on the session bus, sorted.
pub fn list_players(connection: &Connection) -> Result<Vec<String>, SourceError> {
    let dbus = block_on_call(DBusProxy::new(connection))?;
    let mut names: Vec<String> = block_on_call(dbus.list_names())?
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| name.starts_with(MPRIS_PREFIX))
        .collect();
    names.sort();
    Ok(names)
}

/// Picks the bus name for `requested`.
///
/// Full `org.mpris.MediaPlayer2.*` names are used as given. A short name such
/// as `firefox` matches `org.mpris.MediaPlayer2.firefox` or any of its
/// `.instance` suffixes; the first in sorted order wins.
pub fn match_player(requested: &str, available: &[String]) -> Option<String> {
    if requested.starts_with(MPRIS_PREFIX) {
        return Some(requested.to_owned());
    }
    let target = format!("{MPRIS_PREFIX}{requested}");
    let instance_prefix = format!("{target}.");
    let mut candidates: Vec<&String> = available
        .iter()
        .filter(|name| **name == target || name.starts_with(&instance_prefix))
        .collect();
    candidates.sort();
    candidates.first().map(|name| (*name).clone())
}

pub fn resolve_player(connection: &Connection, requested: &str) -> Result<String, SourceError> {
    if requested.starts_with(MPRIS_PREFIX) {
        return Ok(requested.to_owned());
    }
    let available = list_players(connection)?;
    match_player(requested, &available)
        .ok_or_else(|| SourceError::PlayerNotFound(requested.to_owned()))
}
