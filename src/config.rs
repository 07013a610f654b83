use anyhow::Context;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_PLAYER: &str = "firefox";

#[derive(Debug, Clone)]
pub struct Config {
    pub player: String,
    pub canvas: CanvasConfig,
    pub driver: DriverConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: DEFAULT_PLAYER.into(),
            canvas: CanvasConfig::default(),
            driver: DriverConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        for path in Self::candidates() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn parse(data: &str) -> anyhow::Result<Self> {
        let doc: ConfigDocument = toml::from_str(data)?;
        Ok(doc.into())
    }

    fn candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join("config.toml"));
            candidates.push(current_dir.join("config").join("config.toml"));
            candidates.push(current_dir.join("config").join("nowplaying.toml"));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("config.toml"));
                candidates.push(dir.join("config").join("config.toml"));
                candidates.push(dir.join("config").join("nowplaying.toml"));
            }
        }

        candidates
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasConfig {
    pub art_size: u32,
    pub fit_terminal: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            art_size: 20,
            fit_terminal: true,
        }
    }
}

impl CanvasConfig {
    pub fn art_size(&self) -> u32 {
        self.art_size.clamp(2, 512)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    /// Re-read the player state on a fixed period
    #[default]
    Poll,
    /// Repaint when the player announces a property change
    Watch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub mode: DriveMode,
    pub interval_secs: u64,
    pub queue_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mode: DriveMode::Poll,
            interval_secs: 10,
            queue_capacity: 16,
        }
    }
}

impl DriverConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.clamp(1, 3600))
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.clamp(1, 1024)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    player: PlayerSection,
    #[serde(default)]
    canvas: CanvasSection,
    #[serde(default)]
    driver: DriverSection,
    #[serde(default)]
    log: LogSection,
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let canvas_defaults = CanvasConfig::default();
        let driver_defaults = DriverConfig::default();

        Config {
            player: value.player.name.unwrap_or_else(|| DEFAULT_PLAYER.into()),
            canvas: CanvasConfig {
                art_size: value.canvas.art_size.unwrap_or(canvas_defaults.art_size),
                fit_terminal: value
                    .canvas
                    .fit_terminal
                    .unwrap_or(canvas_defaults.fit_terminal),
            },
            driver: DriverConfig {
                mode: value.driver.mode.unwrap_or(driver_defaults.mode),
                interval_secs: value
                    .driver
                    .interval_secs
                    .unwrap_or(driver_defaults.interval_secs),
                queue_capacity: value
                    .driver
                    .queue_capacity
                    .unwrap_or(driver_defaults.queue_capacity),
            },
            log: LogConfig {
                level: value.log.level.unwrap_or_else(|| LogConfig::default().level),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSection {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CanvasSection {
    art_size: Option<u32>,
    fit_terminal: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DriverSection {
    mode: Option<DriveMode>,
    interval_secs: Option<u64>,
    queue_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LogSection {
    level: Option<String>,
}
