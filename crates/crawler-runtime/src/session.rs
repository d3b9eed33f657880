//! Controller session state.
//!
//! The protocol has two states, and streaming is only representable inside
//! the connected one:
//!
//! ```text
//!               connect
//!  Unconnected ─────────▶ Connected { stream: None }
//!       ▲                      │  ▲
//!       │ disconnect / quit /  │  │ stopcam
//!       │ timeout / interrupt  │  │
//!       │                      ▼  │
//!       └──────────────── Connected { stream: Some(worker) }
//!                               startcam
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::stream::{StreamSummary, StreamWorker};

/// One accepted controller.
pub struct ControllerSession {
    /// The only address whose commands are honoured.
    pub controller: SocketAddr,
    /// Identifier used to correlate log lines for this session.
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
    stream: Option<StreamWorker>,
}

impl ControllerSession {
    pub fn new(controller: SocketAddr) -> Self {
        Self {
            controller,
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
            stream: None,
        }
    }

    /// `true` while a stream worker exists and has not lowered its flag.
    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().is_some_and(StreamWorker::is_running)
    }

    /// `true` if a worker handle exists, running or not.
    pub fn has_worker(&self) -> bool {
        self.stream.is_some()
    }

    /// Attach a freshly spawned worker.  Any previous worker is joined first.
    pub fn attach_stream(&mut self, worker: StreamWorker) -> Option<StreamSummary> {
        let previous = self.stop_stream();
        self.stream = Some(worker);
        previous
    }

    /// Stop and join the stream worker, if any.
    pub fn stop_stream(&mut self) -> Option<StreamSummary> {
        self.stream.take().and_then(StreamWorker::stop)
    }

    /// Time since the session was accepted.
    pub fn duration(&self) -> Duration {
        (Utc::now() - self.connected_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Protocol state.
#[derive(Default)]
pub enum SessionState {
    #[default]
    Unconnected,
    Connected(ControllerSession),
}

impl SessionState {
    pub fn controller(&self) -> Option<SocketAddr> {
        match self {
            SessionState::Unconnected => None,
            SessionState::Connected(session) => Some(session.controller),
        }
    }

    pub fn is_streaming(&self) -> bool {
        match self {
            SessionState::Unconnected => false,
            SessionState::Connected(session) => session.is_streaming(),
        }
    }
}
