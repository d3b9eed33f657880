//! [`ServerConfig`] – everything the server needs, fixed at process start.

use std::time::Duration;

use crawler_net::DEFAULT_PORT;
use crawler_types::Direction;
use serde::{Deserialize, Serialize};

use crate::stream::StreamSettings;

/// Idle time after which a silent controller is evicted.
pub const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_secs(120);

/// Locomotion speed before any `speed` command.
pub const DEFAULT_SPEED: u8 = 80;

/// Sound asset played for each session event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundAssets {
    pub boot: String,
    pub connect: String,
    pub disconnect: String,
    pub startcam: String,
    pub stopcam: String,
}

impl Default for SoundAssets {
    fn default() -> Self {
        Self {
            boot: "./sounds/sign.wav".to_string(),
            connect: "./sounds/bell.wav".to_string(),
            disconnect: "./sounds/depress2.wav".to_string(),
            startcam: "./sounds/bell.wav".to_string(),
            stopcam: "./sounds/depress.wav".to_string(),
        }
    }
}

/// Gait action performed for each `move` direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitNames {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
}

impl GaitNames {
    pub fn for_direction(&self, direction: Direction) -> &str {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }
}

impl Default for GaitNames {
    fn default() -> Self {
        Self {
            forward: "forward".to_string(),
            backward: "backward".to_string(),
            left: "turn left".to_string(),
            right: "turn right".to_string(),
        }
    }
}

/// Configuration bundle for [`CrawlerServer`][crate::server::CrawlerServer]
/// and [`Dispatcher`][crate::dispatcher::Dispatcher].
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// UDP port for commands.
    pub port: u16,
    /// Receive idle timeout; a connected controller is evicted when it
    /// elapses.
    pub input_timeout: Duration,
    /// Whether session events chime when the command carries no `nosound`.
    pub sounds_enabled: bool,
    /// Initial locomotion speed, percent.
    pub default_speed: u8,
    pub stream: StreamSettings,
    pub sounds: SoundAssets,
    pub gaits: GaitNames,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            input_timeout: DEFAULT_INPUT_TIMEOUT,
            sounds_enabled: true,
            default_speed: DEFAULT_SPEED,
            stream: StreamSettings::default(),
            sounds: SoundAssets::default(),
            gaits: GaitNames::default(),
        }
    }
}
