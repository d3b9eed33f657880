//! `crawler-hal` – hardware gateways.
//!
//! The control stack never touches servos, speakers or camera sensors
//! directly.  It talks to three traits, and drivers implement them:
//!
//! - [`locomotion`] – [`Locomotion`]: named gait actions and explicit
//!   four-leg step vectors.
//! - [`audio`] – [`SoundPlayer`]: fire-and-forget playback of a sound asset.
//!   [`ProcessSoundPlayer`][audio::ProcessSoundPlayer] hands assets to an
//!   external player command.
//! - [`camera`] – [`FrameSource`]: open a capture, pull encoded frames, close.
//! - [`sim`] – in-process stand-ins for all three, used for headless runs and
//!   CI without a robot attached.

pub mod audio;
pub mod camera;
pub mod locomotion;
pub mod sim;

pub use audio::{ProcessSoundPlayer, SoundPlayer};
pub use camera::FrameSource;
pub use locomotion::Locomotion;
