//! `crawler-runtime` – the crawler's control loop.
//!
//! # Modules
//!
//! - [`server`] – [`CrawlerServer`][server::CrawlerServer]: owns the command
//!   socket and drives the dispatcher until `quit` or interrupt.
//! - [`dispatcher`] – [`Dispatcher`][dispatcher::Dispatcher]: the protocol
//!   state machine (admission, validation, transitions, gateway calls).
//! - [`session`] – [`SessionState`][session::SessionState]: who the
//!   controller is and whether a stream is attached.
//! - [`stream`] – [`StreamWorker`][stream::StreamWorker]: the capture/send
//!   thread with throughput reporting and join-on-stop.
//! - [`config`] – [`ServerConfig`][config::ServerConfig]: values the runtime
//!   is started with.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing].

pub mod config;
pub mod dispatcher;
pub mod server;
pub mod session;
pub mod stream;
pub mod telemetry;

pub use config::{GaitNames, ServerConfig, SoundAssets};
pub use dispatcher::{DisconnectReason, Dispatcher, Gateways, Transition};
pub use server::CrawlerServer;
pub use session::{ControllerSession, SessionState};
pub use stream::{SharedFrameSource, StreamSettings, StreamSummary, StreamWorker, ThroughputMeter};
pub use telemetry::{TracerProviderGuard, init_tracing};
