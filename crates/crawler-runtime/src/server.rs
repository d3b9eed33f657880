//! [`CrawlerServer`] – the receive loop.
//!
//! One thread owns the command socket and the [`Dispatcher`].  Each pass
//! through the loop waits for a datagram, the idle timeout, or the shutdown
//! flag, and hands the outcome to the dispatcher.  Rejected commands are
//! logged and the loop keeps going; it ends after `quit` or an interrupt.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use crawler_net::{Received, UdpTransport};
use crawler_types::CommandError;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{Dispatcher, Transition};

/// Pause after a socket error before receiving again.
const TRANSPORT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct CrawlerServer {
    transport: UdpTransport,
    dispatcher: Dispatcher,
    shutdown: Arc<AtomicBool>,
}

impl CrawlerServer {
    /// `shutdown` is raised from outside (the Ctrl-C handler) to end
    /// [`run`][Self::run] with a graceful disconnect.
    pub fn new(transport: UdpTransport, dispatcher: Dispatcher, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            transport,
            dispatcher,
            shutdown,
        }
    }

    /// Serve until `quit` or shutdown.  Any stream worker has been joined
    /// by the time this returns.  Socket errors are logged and retried.
    pub fn run(mut self) {
        self.dispatcher.announce_ready();

        while !self.dispatcher.terminate_requested() {
            match self.transport.receive(&self.shutdown) {
                Ok(Received::Datagram { payload, sender }) => {
                    match self.dispatcher.handle_datagram(&payload, sender) {
                        Ok(transition) => log_transition(&transition),
                        Err(e) => log_rejection(&e),
                    }
                }
                Ok(Received::Timeout) => {
                    if let Some(transition) = self.dispatcher.handle_timeout() {
                        log_transition(&transition);
                    }
                }
                Ok(Received::Interrupted) => {
                    info!(target: "crawler::boot", "interrupted; shutting down");
                    if let Some(transition) = self.dispatcher.shutdown() {
                        log_transition(&transition);
                    }
                }
                Err(e) => {
                    warn!(target: "crawler::net", error = %e, "receive failed");
                    thread::sleep(TRANSPORT_ERROR_BACKOFF);
                }
            }
        }

        info!(target: "crawler::boot", "terminating");
    }
}

fn log_transition(transition: &Transition) {
    debug!(target: "crawler::net", ?transition, "handled");
}

fn log_rejection(e: &CommandError) {
    match e {
        CommandError::Malformed { .. } | CommandError::UnknownVerb(_) => {
            warn!(target: "crawler::net", error = %e, "invalid command")
        }
        CommandError::UnauthorizedSender { .. } => {
            info!(target: "crawler::net", error = %e, "rejected")
        }
        CommandError::NotConnected { .. } => {
            debug!(target: "crawler::net", error = %e, "ignored")
        }
        CommandError::Hardware(_) => error!(target: "crawler::crawler", error = %e, "command failed"),
    }
}
