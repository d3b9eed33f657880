//! Configuration vault – reads/writes `~/.crawler/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crawler_runtime::config::{DEFAULT_INPUT_TIMEOUT, DEFAULT_SPEED};
use crawler_runtime::{GaitNames, ServerConfig, SoundAssets, StreamSettings};
use crawler_runtime::stream::REPORT_WINDOW;
use crawler_net::DEFAULT_PORT;
use crawler_types::CrawlerError;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CRAWLER_CONFIG";

/// Capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// Frame pacing of the simulated camera.
    pub fps: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 15.0,
        }
    }
}

/// Persisted daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// UDP command port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds without input before the controller is evicted.
    #[serde(default = "default_input_timeout_secs")]
    pub input_timeout_secs: u64,

    /// Whether session events chime unless the command says `nosound`.
    #[serde(default = "default_true")]
    pub sounds_enabled: bool,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Locomotion speed before the first `speed` command, percent.
    #[serde(default = "default_speed")]
    pub default_speed: u8,

    /// Command line used to play a sound asset (the asset path is appended),
    /// e.g. `"aplay -q"`.  Unset means sounds are only logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_player: Option<String>,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub sounds: SoundAssets,

    #[serde(default)]
    pub gaits: GaitNames,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_input_timeout_secs() -> u64 {
    DEFAULT_INPUT_TIMEOUT.as_secs()
}
fn default_true() -> bool {
    true
}
fn default_log_filter() -> String {
    "info".to_string()
}
fn default_speed() -> u8 {
    DEFAULT_SPEED
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            input_timeout_secs: default_input_timeout_secs(),
            sounds_enabled: true,
            log_filter: default_log_filter(),
            default_speed: default_speed(),
            audio_player: None,
            camera: CameraConfig::default(),
            sounds: SoundAssets::default(),
            gaits: GaitNames::default(),
        }
    }
}

impl Config {
    /// The runtime view of this configuration.
    ///
    /// A zero timeout is raised to one second; a speed above 100 is clamped.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            input_timeout: Duration::from_secs(self.input_timeout_secs.max(1)),
            sounds_enabled: self.sounds_enabled,
            default_speed: self.default_speed.min(100),
            stream: StreamSettings {
                width: self.camera.width,
                height: self.camera.height,
                report_window: REPORT_WINDOW,
            },
            sounds: self.sounds.clone(),
            gaits: self.gaits.clone(),
        }
    }
}

/// `$CRAWLER_CONFIG` if set, else `~/.crawler/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".crawler").join("config.toml")
}

/// Load the config from disk and apply `CRAWLER_*` overrides.  A missing
/// file yields the defaults (with overrides); the flag says whether a file
/// was found.
pub fn load() -> Result<(Config, bool), CrawlerError> {
    let found = load_from(&config_path())?;
    let exists = found.is_some();
    let mut cfg = found.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok((cfg, exists))
}

/// Load the config from a specific path.  Returns `None` if the file does not
/// exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, CrawlerError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| config_error(format!("failed to read {}: {e}", path.display())))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| config_error(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `CRAWLER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `CRAWLER_PORT` | `port` |
/// | `CRAWLER_TIMEOUT_SECS` | `input_timeout_secs` |
/// | `CRAWLER_SOUNDS` | `sounds_enabled` (`0`/`1`/`true`/`false`) |
/// | `CRAWLER_LOG` | `log_filter` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("CRAWLER_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.port = port;
    }
    if let Ok(v) = std::env::var("CRAWLER_TIMEOUT_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.input_timeout_secs = secs;
    }
    if let Ok(v) = std::env::var("CRAWLER_SOUNDS")
        && let Some(enabled) = parse_flag(&v)
    {
        cfg.sounds_enabled = enabled;
    }
    if let Ok(v) = std::env::var("CRAWLER_LOG")
        && !v.trim().is_empty()
    {
        cfg.log_filter = v;
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Save the config to disk, creating the parent directory if necessary.
pub fn save(cfg: &Config) -> Result<PathBuf, CrawlerError> {
    let path = config_path();
    save_to(cfg, &path)?;
    Ok(path)
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), CrawlerError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| config_error(format!("failed to create {}: {e}", parent.display())))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| config_error(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| config_error(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}

fn config_error(details: String) -> CrawlerError {
    CrawlerError::Config(details)
}
