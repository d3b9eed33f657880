//! `crawler-types` – shared vocabulary for the crawler control stack.
//!
//! Everything that crosses a crate boundary lives here: the parsed
//! [`Command`] a controller sends, the [`StepVector`] handed to the
//! locomotion gateway, the [`ThroughputReport`] emitted by the stream worker,
//! and the error taxonomy ([`CommandError`], [`CrawlerError`]).
//!
//! This crate performs no I/O.

pub mod command;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use command::{Command, Verb};

/// Number of legs on the crawler, and therefore positions in a [`StepVector`].
pub const LEG_COUNT: usize = 4;

/// Direction argument of the `move` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    /// Parse the wire token (`"forward"`, `"backward"`, `"left"`, `"right"`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "forward" => Some(Self::Forward),
            "backward" => Some(Self::Backward),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// Explicit foot positions for all four legs, bypassing named gait actions.
///
/// Legs are ordered right-front, left-front, right-back, left-back; each
/// position is an `(x, y, z)` triple in the crawler's leg coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepVector(pub [[i32; 3]; LEG_COUNT]);

impl StepVector {
    /// Build a step vector from exactly twelve coordinates.
    ///
    /// Returns `None` for any other length.
    pub fn from_flat(values: &[i32]) -> Option<Self> {
        if values.len() != LEG_COUNT * 3 {
            return None;
        }
        let mut legs = [[0i32; 3]; LEG_COUNT];
        for (leg, chunk) in legs.iter_mut().zip(values.chunks_exact(3)) {
            leg.copy_from_slice(chunk);
        }
        Some(Self(legs))
    }

    pub fn right_front(&self) -> [i32; 3] {
        self.0[0]
    }

    pub fn left_front(&self) -> [i32; 3] {
        self.0[1]
    }

    pub fn right_back(&self) -> [i32; 3] {
        self.0[2]
    }

    pub fn left_back(&self) -> [i32; 3] {
        self.0[3]
    }
}

/// One throughput observation from the stream worker.
///
/// Emitted every time the reporting window elapses, and once more for the
/// partial window when the worker exits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    /// Frames sent during the window.
    pub frames: u64,
    /// Length of the window.
    pub elapsed: Duration,
    /// `true` for the final, partial window reported on exit.
    pub final_window: bool,
}

impl ThroughputReport {
    /// Average frames per second over the window (0 for an empty window).
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.frames as f64 / secs
    }
}

/// Why a single datagram produced no state change.
///
/// None of these are fatal: the server loop logs them and keeps receiving.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Malformed command `{raw}`: {reason}")]
    Malformed { raw: String, reason: String },

    #[error("Command from {sender} ignored; controller is {controller}")]
    UnauthorizedSender {
        sender: SocketAddr,
        controller: SocketAddr,
    },

    #[error("Unknown command `{0}`")]
    UnknownVerb(String),

    #[error("`{verb}` ignored: no controller connected")]
    NotConnected { verb: String },

    #[error(transparent)]
    Hardware(#[from] CrawlerError),
}

impl CommandError {
    pub(crate) fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

/// Global error type spanning gateway faults, transport failures and
/// configuration problems.
#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Send to {dest} failed: {details}")]
    SendFailure { dest: SocketAddr, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl CrawlerError {
    /// Shorthand for a [`CrawlerError::HardwareFault`].
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        Self::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }
}
