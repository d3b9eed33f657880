//! In-process simulated gateways for running without a robot attached.
//!
//! Every sim logs what it was asked to do and remembers the last command, so
//! `crawlerd` can run on a laptop and tests can assert on the calls.
//!
//! # Example
//!
//! ```rust
//! use crawler_hal::sim::{SimCamera, SimLocomotion};
//! use crawler_hal::{FrameSource, Locomotion};
//!
//! let mut legs = SimLocomotion::new();
//! legs.perform_gait("forward", 1, 80).unwrap();
//! assert_eq!(legs.gait_count(), 1);
//!
//! let mut cam = SimCamera::new(0.0);
//! cam.open(640, 480).unwrap();
//! assert!(!cam.next_frame().unwrap().is_empty());
//! cam.close();
//! ```

use std::thread;
use std::time::Duration;

use crawler_types::{CrawlerError, StepVector};
use tracing::{info, trace};

use crate::audio::SoundPlayer;
use crate::camera::FrameSource;
use crate::locomotion::Locomotion;

// ────────────────────────────────────────────────────────────────────────────
// Simulated legs
// ────────────────────────────────────────────────────────────────────────────

/// Simulated leg controller.  Always succeeds.
#[derive(Debug, Default)]
pub struct SimLocomotion {
    gaits: u64,
    last_gait: Option<(String, u32, u8)>,
    last_step: Option<(StepVector, u8)>,
}

impl SimLocomotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of gait actions performed so far.
    pub fn gait_count(&self) -> u64 {
        self.gaits
    }

    pub fn last_gait(&self) -> Option<&(String, u32, u8)> {
        self.last_gait.as_ref()
    }

    pub fn last_step(&self) -> Option<&(StepVector, u8)> {
        self.last_step.as_ref()
    }
}

impl Locomotion for SimLocomotion {
    fn perform_gait(
        &mut self,
        action: &str,
        repeat: u32,
        speed_percent: u8,
    ) -> Result<(), CrawlerError> {
        info!(target: "crawler::crawler", action, repeat, speed = speed_percent, "sim gait");
        self.gaits += 1;
        self.last_gait = Some((action.to_string(), repeat, speed_percent));
        Ok(())
    }

    fn perform_step(&mut self, step: &StepVector, speed_percent: u8) -> Result<(), CrawlerError> {
        info!(target: "crawler::crawler", step = ?step.0, speed = speed_percent, "sim step");
        self.last_step = Some((*step, speed_percent));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated speaker
// ────────────────────────────────────────────────────────────────────────────

/// Simulated speaker that only logs.  Always succeeds.
#[derive(Debug, Default)]
pub struct SimSoundPlayer {
    played: Vec<String>,
}

impl SimSoundPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every asset played so far, oldest first.
    pub fn played(&self) -> &[String] {
        &self.played
    }
}

impl SoundPlayer for SimSoundPlayer {
    fn play(&mut self, asset: &str) -> Result<(), CrawlerError> {
        info!(target: "crawler::sound", asset, "sim sound");
        self.played.push(asset.to_string());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated camera
// ────────────────────────────────────────────────────────────────────────────

/// Size of every synthetic frame, in bytes.
const SIM_FRAME_BYTES: usize = 4096;

/// Simulated camera producing small synthetic "JPEG" frames.
///
/// Each frame starts with the JPEG SOI marker, carries the frame index and
/// resolution, is padded with a rolling pattern and ends with the EOI
/// marker.  `next_frame` sleeps to emulate a sensor running at `fps`.
/// Pacing is disabled for 0, and for rates too slow to express as a frame
/// interval.
#[derive(Debug)]
pub struct SimCamera {
    frame_interval: Option<Duration>,
    resolution: Option<(u32, u32)>,
    index: u32,
}

impl SimCamera {
    pub fn new(fps: f64) -> Self {
        let frame_interval = (fps > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / fps).ok())
            .flatten();
        Self {
            frame_interval,
            resolution: None,
            index: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.resolution.is_some()
    }
}

impl FrameSource for SimCamera {
    fn open(&mut self, width: u32, height: u32) -> Result<(), CrawlerError> {
        info!(target: "crawler::camera", width, height, "sim camera opened");
        self.resolution = Some((width, height));
        self.index = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Vec<u8>, CrawlerError> {
        let (width, height) = self
            .resolution
            .ok_or_else(|| CrawlerError::hardware("camera", "capture is not open"))?;
        if let Some(interval) = self.frame_interval {
            thread::sleep(interval);
        }

        let mut frame = Vec::with_capacity(SIM_FRAME_BYTES);
        frame.extend_from_slice(&[0xFF, 0xD8]);
        frame.extend_from_slice(&self.index.to_be_bytes());
        frame.extend_from_slice(&width.to_be_bytes());
        frame.extend_from_slice(&height.to_be_bytes());
        let fill = SIM_FRAME_BYTES - frame.len() - 2;
        frame.extend((0..fill).map(|i| (i as u32).wrapping_add(self.index) as u8));
        frame.extend_from_slice(&[0xFF, 0xD9]);

        trace!(target: "crawler::camera", index = self.index, "sim frame captured");
        self.index = self.index.wrapping_add(1);
        Ok(frame)
    }

    fn close(&mut self) {
        if self.resolution.take().is_some() {
            info!(target: "crawler::camera", frames = self.index, "sim camera closed");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
