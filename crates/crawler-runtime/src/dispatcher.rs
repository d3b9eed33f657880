//! [`Dispatcher`] – the command protocol state machine.
//!
//! Each datagram is handled in three steps:
//!
//! 1. **Admission** – if a controller is connected and the sender is someone
//!    else, the datagram is rejected with
//!    [`CommandError::UnauthorizedSender`] before its arguments are even
//!    looked at.  While unconnected, everything except `connect` is an inert
//!    [`CommandError::NotConnected`].
//! 2. **Validation** – the arguments are checked ([`Command::verb`]).  A
//!    malformed command changes nothing.
//! 3. **Transition** – the session state changes and the gateways are called.
//!
//! | State | Verb | Action | Next |
//! |---|---|---|---|
//! | Unconnected | `connect` | reply `connected`, chime | Connected |
//! | Connected | `connect` | log and ignore | Connected |
//! | Connected | `disconnect` | reply `disconnected`, join stream, chime | Unconnected |
//! | Connected | `quit` | as `disconnect`, then request termination | Unconnected |
//! | Connected | `startcam` | spawn stream worker, chime | Connected (streaming) |
//! | Connected | `stopcam` | join stream worker, chime | Connected |
//! | Connected | `move <dir>` | gait action once at current speed | Connected |
//! | Connected | `speed <n>` | set speed | Connected |
//! | Connected | `step <12 ints>` | explicit step at current speed | Connected |
//!
//! An idle timeout while connected evicts the controller without a reply.
//! An interrupt performs the full `disconnect` sequence.

use std::net::SocketAddr;
use std::sync::Arc;

use crawler_hal::{Locomotion, SoundPlayer};
use crawler_net::Outbound;
use crawler_types::{Command, CommandError, CrawlerError, Direction, StepVector, Verb};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::session::{ControllerSession, SessionState};
use crate::stream::{SharedFrameSource, StreamSummary, StreamWorker};

/// Reply sent to a controller when its `connect` is accepted.
pub const REPLY_CONNECTED: &[u8] = b"connected";

/// Reply sent to a controller on `disconnect` / `quit` / interrupt.
pub const REPLY_DISCONNECTED: &[u8] = b"disconnected";

/// The hardware the dispatcher drives.
pub struct Gateways {
    pub locomotion: Box<dyn Locomotion>,
    pub speaker: Box<dyn SoundPlayer>,
    pub camera: SharedFrameSource,
}

/// Why a controller session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Requested,
    Quit,
    IdleTimeout,
    Interrupted,
}

/// The state change a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Connected { controller: SocketAddr, session: Uuid },
    /// `connect` from the current controller; nothing was sent.
    AlreadyConnected,
    Disconnected {
        controller: SocketAddr,
        reason: DisconnectReason,
        stream: Option<StreamSummary>,
    },
    StreamStarted { dest: SocketAddr },
    /// `startcam` while a worker is already running; nothing was spawned.
    StreamAlreadyActive,
    /// `stopcam`; carries the joined worker's summary if one was running.
    StreamStopped(Option<StreamSummary>),
    Moved { direction: Direction, action: String },
    SpeedSet(u8),
    Stepped(StepVector),
}

/// Protocol state machine for one robot.
pub struct Dispatcher {
    config: ServerConfig,
    gateways: Gateways,
    replies: Arc<dyn Outbound>,
    frames: Arc<dyn Outbound>,
    state: SessionState,
    speed: u8,
    terminate_requested: bool,
}

impl Dispatcher {
    /// `replies` carries `connected` / `disconnected`; `frames` is handed to
    /// every stream worker.  They should not share a socket.
    pub fn new(
        config: ServerConfig,
        gateways: Gateways,
        replies: Arc<dyn Outbound>,
        frames: Arc<dyn Outbound>,
    ) -> Self {
        let speed = config.default_speed;
        Self {
            config,
            gateways,
            replies,
            frames,
            state: SessionState::Unconnected,
            speed,
            terminate_requested: false,
        }
    }

    pub fn controller(&self) -> Option<SocketAddr> {
        self.state.controller()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming()
    }

    /// Current locomotion speed, percent.
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// `true` once `quit` or an interrupt has been handled.
    pub fn terminate_requested(&self) -> bool {
        self.terminate_requested
    }

    /// Play the boot chime.
    pub fn announce_ready(&mut self) {
        info!(target: "crawler::boot", "ready to go");
        let asset = self.config.sounds.boot.clone();
        self.chime(&asset, None);
    }

    /// Decode and handle one raw datagram.
    ///
    /// Payloads that are not valid UTF-8 are decoded lossily.
    pub fn handle_datagram(
        &mut self,
        payload: &[u8],
        sender: SocketAddr,
    ) -> Result<Transition, CommandError> {
        let text = String::from_utf8_lossy(payload);
        debug!(
            target: "crawler::net",
            %sender,
            msg = %text,
            connected = self.controller().is_some(),
            "received"
        );
        let command = Command::parse(&text)?;
        self.handle_command(&command, sender)
    }

    /// Handle one parsed command from `sender`.
    pub fn handle_command(
        &mut self,
        command: &Command,
        sender: SocketAddr,
    ) -> Result<Transition, CommandError> {
        match &self.state {
            SessionState::Connected(session) if session.controller != sender => {
                return Err(CommandError::UnauthorizedSender {
                    sender,
                    controller: session.controller,
                });
            }
            SessionState::Unconnected if !command.is_connect() => {
                return Err(not_connected(command));
            }
            _ => {}
        }

        match command.verb()? {
            Verb::Connect { sound } => Ok(self.connect(sender, sound)),
            Verb::Disconnect { sound } => self
                .disconnect(DisconnectReason::Requested, sound)
                .ok_or_else(|| not_connected(command)),
            Verb::Quit => {
                let transition = self
                    .disconnect(DisconnectReason::Quit, None)
                    .ok_or_else(|| not_connected(command))?;
                self.terminate_requested = true;
                Ok(transition)
            }
            Verb::StartCam { sound } => self
                .start_stream(sound)?
                .ok_or_else(|| not_connected(command)),
            Verb::StopCam { sound } => Ok(self.stop_stream(sound)),
            Verb::Move(direction) => {
                let action = self.config.gaits.for_direction(direction).to_string();
                info!(target: "crawler::crawler", action = %action, speed = self.speed, "gait");
                self.gateways.locomotion.perform_gait(&action, 1, self.speed)?;
                Ok(Transition::Moved { direction, action })
            }
            Verb::Speed(speed) => {
                info!(target: "crawler::crawler", from = self.speed, to = speed, "speed set");
                self.speed = speed;
                Ok(Transition::SpeedSet(speed))
            }
            Verb::Step(step) => {
                info!(target: "crawler::crawler", step = ?step.0, speed = self.speed, "step");
                self.gateways.locomotion.perform_step(&step, self.speed)?;
                Ok(Transition::Stepped(step))
            }
        }
    }

    /// The receive call timed out.  Evicts the controller if there is one,
    /// without sending `disconnected`.
    pub fn handle_timeout(&mut self) -> Option<Transition> {
        let controller = self.controller()?;
        info!(
            target: "crawler::net",
            %controller,
            timeout_secs = self.config.input_timeout.as_secs(),
            "no input within timeout; disconnecting"
        );
        self.disconnect(DisconnectReason::IdleTimeout, None)
    }

    /// Graceful shutdown on interrupt: full disconnect sequence if a
    /// controller is connected, then request termination.
    pub fn shutdown(&mut self) -> Option<Transition> {
        self.terminate_requested = true;
        self.disconnect(DisconnectReason::Interrupted, None)
    }

    // ── transitions ──────────────────────────────────────────────────────────

    fn connect(&mut self, sender: SocketAddr, sound: Option<bool>) -> Transition {
        if let SessionState::Connected(_) = self.state {
            info!(target: "crawler::net", %sender, "already connected; ignoring connect");
            return Transition::AlreadyConnected;
        }

        let session = ControllerSession::new(sender);
        let id = session.id;
        self.state = SessionState::Connected(session);
        info!(target: "crawler::net", controller = %sender, session = %id, "connected");
        self.replies.deliver(REPLY_CONNECTED, sender);
        let asset = self.config.sounds.connect.clone();
        self.chime(&asset, sound);

        Transition::Connected {
            controller: sender,
            session: id,
        }
    }

    /// Reply (unless evicted), join the stream, chime, clear the controller.
    /// `None` when nobody is connected.
    fn disconnect(&mut self, reason: DisconnectReason, sound: Option<bool>) -> Option<Transition> {
        let SessionState::Connected(mut session) = std::mem::take(&mut self.state) else {
            return None;
        };
        let controller = session.controller;
        info!(
            target: "crawler::net",
            %controller,
            session = %session.id,
            ?reason,
            duration_secs = session.duration().as_secs(),
            "disconnecting"
        );

        if reason != DisconnectReason::IdleTimeout {
            self.replies.deliver(REPLY_DISCONNECTED, controller);
        }
        let stream = session.stop_stream();
        let asset = self.config.sounds.disconnect.clone();
        self.chime(&asset, sound);

        Some(Transition::Disconnected {
            controller,
            reason,
            stream,
        })
    }

    fn start_stream(&mut self, sound: Option<bool>) -> Result<Option<Transition>, CrawlerError> {
        let SessionState::Connected(session) = &mut self.state else {
            return Ok(None);
        };
        if session.is_streaming() {
            info!(target: "crawler::net", "camera already running; ignoring startcam");
            return Ok(Some(Transition::StreamAlreadyActive));
        }
        if session.has_worker() {
            // The previous worker gave up on its own; reap it first.
            session.stop_stream();
        }

        let dest = session.controller;
        info!(target: "crawler::camera", %dest, "starting camera feed");
        let worker = StreamWorker::spawn(
            dest,
            Arc::clone(&self.gateways.camera),
            Arc::clone(&self.frames),
            self.config.stream,
        )?;
        session.attach_stream(worker);

        let asset = self.config.sounds.startcam.clone();
        self.chime(&asset, sound);
        Ok(Some(Transition::StreamStarted { dest }))
    }

    fn stop_stream(&mut self, sound: Option<bool>) -> Transition {
        let summary = match &mut self.state {
            SessionState::Connected(session) => session.stop_stream(),
            SessionState::Unconnected => None,
        };
        info!(target: "crawler::camera", was_streaming = summary.is_some(), "camera feed stopped");
        let asset = self.config.sounds.stopcam.clone();
        self.chime(&asset, sound);
        Transition::StreamStopped(summary)
    }

    /// Play `asset` unless `sound` (or, if absent, the configured default)
    /// says otherwise.  Audio failures never fail a transition.
    fn chime(&mut self, asset: &str, sound: Option<bool>) {
        if !sound.unwrap_or(self.config.sounds_enabled) {
            return;
        }
        if let Err(e) = self.gateways.speaker.play(asset) {
            warn!(target: "crawler::sound", asset, error = %e, "could not play sound");
        }
    }
}

fn not_connected(command: &Command) -> CommandError {
    CommandError::NotConnected {
        verb: command.verb_token().to_string(),
    }
}
