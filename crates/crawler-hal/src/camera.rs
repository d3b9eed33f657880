//! `FrameSource` trait for the crawler's camera.
//!
//! A frame source hands out already-encoded images (e.g. JPEG) so that one
//! frame fits in one datagram.  Capture and encoding quality are the
//! driver's concern.

use crawler_types::CrawlerError;

/// A camera that produces encoded frames.
///
/// The stream worker calls [`open`][Self::open] once on entry,
/// [`next_frame`][Self::next_frame] in a loop, and [`close`][Self::close]
/// exactly once on every exit path.
pub trait FrameSource: Send {
    /// Start capturing at `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::HardwareFault`] if the sensor cannot be opened.
    fn open(&mut self, width: u32, height: u32) -> Result<(), CrawlerError>;

    /// Block until the next frame is available and return it encoded.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::HardwareFault`] if capture or encoding fails.
    fn next_frame(&mut self) -> Result<Vec<u8>, CrawlerError>;

    /// Stop capturing and release the sensor.  Must be idempotent.
    fn close(&mut self);
}
