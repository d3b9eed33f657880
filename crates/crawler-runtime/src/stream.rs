//! [`StreamWorker`] – best-effort video stream to the controller.
//!
//! The worker runs on its own OS thread so that a slow or blocking camera
//! never stalls the command loop.  The only state it shares with the
//! dispatcher is the `running` flag, an [`AtomicBool`] with a single writer
//! per transition: the dispatcher raises it on start and lowers it on stop,
//! and the worker lowers it itself when it gives up.  The destination
//! address is a copy taken at start time.
//!
//! Stopping is a join.  [`StreamWorker::stop`] lowers the flag and then
//! waits for the thread, which finishes the frame in flight, closes the
//! camera and returns its [`StreamSummary`].
//!
//! Every 10 seconds the worker logs a [`ThroughputReport`]; one final report
//! for the partial window is produced on exit.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crawler_hal::FrameSource;
use crawler_net::Outbound;
use crawler_types::{CrawlerError, ThroughputReport};
use tracing::{error, info, trace, warn};

/// A camera shared between the dispatcher (which owns it) and whichever
/// stream worker is currently running.
pub type SharedFrameSource = Arc<Mutex<dyn FrameSource>>;

/// Length of a throughput reporting window.
pub const REPORT_WINDOW: Duration = Duration::from_secs(10);

/// Consecutive capture failures after which the worker gives up.
const MAX_CONSECUTIVE_FRAME_ERRORS: u32 = 10;

/// Capture parameters for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub width: u32,
    pub height: u32,
    pub report_window: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            report_window: REPORT_WINDOW,
        }
    }
}

/// What a finished worker did.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub dest: SocketAddr,
    /// Frames handed to the OS over the worker's lifetime.
    pub frames_sent: u64,
    /// Frames that could not be captured or sent.
    pub frames_failed: u64,
    /// Full windows reported while running.
    pub windows_reported: u32,
    /// Report for the partial window at exit.
    pub final_report: ThroughputReport,
}

// ────────────────────────────────────────────────────────────────────────────
// Throughput meter
// ────────────────────────────────────────────────────────────────────────────

/// Rolling frame counter with a fixed reporting window.
#[derive(Debug)]
pub struct ThroughputMeter {
    window: Duration,
    window_start: Instant,
    frames: u64,
}

impl ThroughputMeter {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            window_start: now,
            frames: 0,
        }
    }

    /// Count one frame sent at `now`.
    ///
    /// When the current window has run longer than the reporting window, a
    /// report for it is returned and a new window starts; the frame is then
    /// counted in the new window.
    pub fn record_frame(&mut self, now: Instant) -> Option<ThroughputReport> {
        let elapsed = now.saturating_duration_since(self.window_start);
        let report = (elapsed > self.window).then(|| {
            let report = ThroughputReport {
                frames: self.frames,
                elapsed,
                final_window: false,
            };
            self.frames = 0;
            self.window_start = now;
            report
        });
        self.frames += 1;
        report
    }

    /// Close the current, possibly partial, window.
    pub fn finish(&self, now: Instant) -> ThroughputReport {
        ThroughputReport {
            frames: self.frames,
            elapsed: now.saturating_duration_since(self.window_start),
            final_window: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Worker handle
// ────────────────────────────────────────────────────────────────────────────

/// Handle to a running (or finished) stream worker thread.
pub struct StreamWorker {
    dest: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<StreamSummary>>,
}

impl StreamWorker {
    /// Raise the running flag and spawn the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::HardwareFault`] if the OS refuses to create the
    /// thread.  The flag is lowered again in that case.
    pub fn spawn(
        dest: SocketAddr,
        camera: SharedFrameSource,
        outbound: Arc<dyn Outbound>,
        settings: StreamSettings,
    ) -> Result<Self, CrawlerError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("stream-worker".to_string())
            .spawn(move || run_stream(dest, &camera, outbound.as_ref(), settings, &flag))
            .map_err(|e| {
                running.store(false, Ordering::SeqCst);
                CrawlerError::hardware("stream-worker", format!("failed to spawn thread: {e}"))
            })?;

        info!(target: "crawler::camera", %dest, "stream worker started");
        Ok(Self {
            dest,
            running,
            handle: Some(handle),
        })
    }

    /// `true` until the flag is lowered by [`stop`][Self::stop] or by the
    /// worker giving up.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Lower the running flag and wait for the thread to exit.
    ///
    /// Returns `None` only if the worker thread panicked.
    pub fn stop(mut self) -> Option<StreamSummary> {
        self.join()
    }

    fn join(&mut self) -> Option<StreamSummary> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                error!(target: "crawler::camera", dest = %self.dest, "stream worker panicked");
                None
            }
        }
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.join();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Worker body
// ────────────────────────────────────────────────────────────────────────────

/// Holds the camera for the worker's lifetime.  Dropping it closes the
/// capture and lowers the running flag, on every exit path including panics.
struct Capture<'a> {
    camera: MutexGuard<'a, dyn FrameSource + 'static>,
    running: &'a AtomicBool,
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        self.camera.close();
        self.running.store(false, Ordering::SeqCst);
    }
}

fn run_stream(
    dest: SocketAddr,
    camera: &Mutex<dyn FrameSource>,
    outbound: &dyn Outbound,
    settings: StreamSettings,
    running: &AtomicBool,
) -> StreamSummary {
    let mut capture = Capture {
        camera: camera.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        running,
    };

    let mut meter = ThroughputMeter::new(settings.report_window, Instant::now());
    let mut frames_sent = 0u64;
    let mut frames_failed = 0u64;
    let mut windows_reported = 0u32;

    match capture.camera.open(settings.width, settings.height) {
        Ok(()) => {
            info!(
                target: "crawler::camera",
                width = settings.width,
                height = settings.height,
                "capture opened"
            );
            let mut consecutive_errors = 0u32;

            while running.load(Ordering::SeqCst) {
                let sent = match capture.camera.next_frame() {
                    Ok(frame) => {
                        consecutive_errors = 0;
                        let ok = outbound.deliver(&frame, dest);
                        trace!(target: "crawler::stream", %dest, bytes = frame.len(), ok, "frame");
                        ok
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        warn!(target: "crawler::camera", error = %e, consecutive_errors, "frame capture failed");
                        if consecutive_errors >= MAX_CONSECUTIVE_FRAME_ERRORS {
                            error!(target: "crawler::camera", "too many capture failures; stopping stream");
                            frames_failed += 1;
                            break;
                        }
                        false
                    }
                };

                if !sent {
                    frames_failed += 1;
                    continue;
                }
                frames_sent += 1;
                if let Some(report) = meter.record_frame(Instant::now()) {
                    windows_reported += 1;
                    info!(
                        target: "crawler::net",
                        %dest,
                        frames = report.frames,
                        fps = report.fps(),
                        "stream throughput"
                    );
                }
            }
        }
        Err(e) => {
            error!(target: "crawler::camera", error = %e, "failed to open capture");
        }
    }

    let final_report = meter.finish(Instant::now());
    drop(capture);
    info!(
        target: "crawler::net",
        %dest,
        frames = final_report.frames,
        fps = final_report.fps(),
        total = frames_sent,
        "stream worker exiting"
    );

    StreamSummary {
        dest,
        frames_sent,
        frames_failed,
        windows_reported,
        final_report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct CameraLog {
        opens: AtomicU32,
        closes: AtomicU32,
    }

    struct ScriptedCamera {
        log: Arc<CameraLog>,
        fail_open: bool,
        fail_frames: bool,
        delay: Duration,
    }

    impl ScriptedCamera {
        fn shared(log: &Arc<CameraLog>) -> Self {
            Self {
                log: Arc::clone(log),
                fail_open: false,
                fail_frames: false,
                delay: Duration::from_millis(2),
            }
        }
    }

    impl FrameSource for ScriptedCamera {
        fn open(&mut self, _width: u32, _height: u32) -> Result<(), CrawlerError> {
            self.log.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail_open {
                return Err(CrawlerError::hardware("camera", "no sensor"));
            }
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Vec<u8>, CrawlerError> {
            thread::sleep(self.delay);
            if self.fail_frames {
                return Err(CrawlerError::hardware("camera", "timeout"));
            }
            Ok(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9])
        }

        fn close(&mut self) {
            self.log.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingOutbound {
        sent: AtomicU32,
    }

    impl Outbound for CountingOutbound {
        fn send(&self, _payload: &[u8], _dest: SocketAddr) -> Result<(), CrawlerError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn dest() -> SocketAddr {
        "1.2.3.4:5000".parse().unwrap()
    }

    fn settings() -> StreamSettings {
        StreamSettings {
            width: 64,
            height: 48,
            report_window: Duration::from_millis(20),
        }
    }

    // ------------------------------------------------------------------
    // Meter
    // ------------------------------------------------------------------

    #[test]
    fn meter_reports_after_window_and_resets() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::new(Duration::from_secs(10), start);
        for i in 0..5 {
            assert!(meter.record_frame(start + Duration::from_secs(i)).is_none());
        }
        let report = meter
            .record_frame(start + Duration::from_secs(11))
            .expect("window elapsed");
        assert_eq!(report.frames, 5);
        assert!(!report.final_window);
        assert!((report.fps() - 5.0 / 11.0).abs() < 1e-9);

        // The frame that closed the window counts in the next one.
        let last = meter.finish(start + Duration::from_secs(12));
        assert_eq!(last.frames, 1);
        assert!(last.final_window);
        assert_eq!(last.elapsed, Duration::from_secs(1));
    }

    #[test]
    fn meter_window_boundary_is_exclusive() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::new(Duration::from_secs(10), start);
        assert!(meter.record_frame(start + Duration::from_secs(10)).is_none());
    }

    // ------------------------------------------------------------------
    // Worker
    // ------------------------------------------------------------------

    #[test]
    fn stop_joins_and_closes_capture_once() {
        let log = Arc::new(CameraLog::default());
        let camera: SharedFrameSource = Arc::new(Mutex::new(ScriptedCamera::shared(&log)));
        let outbound = Arc::new(CountingOutbound::default());

        let worker = StreamWorker::spawn(dest(), camera, outbound.clone(), settings()).unwrap();
        assert!(worker.is_running());
        thread::sleep(Duration::from_millis(60));

        let summary = worker.stop().expect("worker did not panic");
        assert_eq!(log.opens.load(Ordering::SeqCst), 1);
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
        assert!(summary.frames_sent > 0);
        assert_eq!(summary.frames_sent, u64::from(outbound.sent.load(Ordering::SeqCst)));
        assert!(summary.final_report.final_window);
        assert_eq!(summary.dest, dest());
    }

    #[test]
    fn immediate_stop_still_closes_capture() {
        let log = Arc::new(CameraLog::default());
        let camera: SharedFrameSource = Arc::new(Mutex::new(ScriptedCamera::shared(&log)));
        let worker =
            StreamWorker::spawn(dest(), camera, Arc::new(CountingOutbound::default()), settings())
                .unwrap();
        let summary = worker.stop().unwrap();
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
        assert!(summary.final_report.final_window);
    }

    #[test]
    fn open_failure_lowers_flag_and_closes() {
        let log = Arc::new(CameraLog::default());
        let mut cam = ScriptedCamera::shared(&log);
        cam.fail_open = true;
        let camera: SharedFrameSource = Arc::new(Mutex::new(cam));

        let worker =
            StreamWorker::spawn(dest(), camera, Arc::new(CountingOutbound::default()), settings())
                .unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while worker.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!worker.is_running());

        let summary = worker.stop().unwrap();
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_capture_failures_end_the_stream() {
        let log = Arc::new(CameraLog::default());
        let mut cam = ScriptedCamera::shared(&log);
        cam.fail_frames = true;
        cam.delay = Duration::ZERO;
        let camera: SharedFrameSource = Arc::new(Mutex::new(cam));

        let worker =
            StreamWorker::spawn(dest(), camera, Arc::new(CountingOutbound::default()), settings())
                .unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while worker.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!worker.is_running(), "flag must not stay raised after giving up");

        let summary = worker.stop().unwrap();
        assert_eq!(summary.frames_failed, u64::from(MAX_CONSECUTIVE_FRAME_ERRORS));
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn long_stream_reports_full_windows() {
        let log = Arc::new(CameraLog::default());
        let camera: SharedFrameSource = Arc::new(Mutex::new(ScriptedCamera::shared(&log)));
        let worker =
            StreamWorker::spawn(dest(), camera, Arc::new(CountingOutbound::default()), settings())
                .unwrap();
        thread::sleep(Duration::from_millis(150));
        let summary = worker.stop().unwrap();
        assert!(summary.windows_reported >= 1);
    }

    #[test]
    fn dropping_the_handle_joins_the_worker() {
        let log = Arc::new(CameraLog::default());
        let camera: SharedFrameSource = Arc::new(Mutex::new(ScriptedCamera::shared(&log)));
        let worker =
            StreamWorker::spawn(dest(), camera, Arc::new(CountingOutbound::default()), settings())
                .unwrap();
        drop(worker);
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    }
}
