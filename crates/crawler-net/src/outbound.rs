//! Outbound unicast datagrams.
//!
//! Replies from the command path and frames from the stream worker go out
//! through separate sockets, never through the bound command socket, so a
//! slow send on one path cannot hold up the other.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crawler_types::CrawlerError;
use tracing::{trace, warn};

/// Largest payload that fits in a single UDP datagram over IPv4.
pub const MAX_DATAGRAM_BYTES: usize = 65_507;

/// Something that can put one datagram on the wire.
pub trait Outbound: Send + Sync {
    /// Send `payload` to `dest` as a single datagram.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::SendFailure`] if the datagram could not be
    /// sent.  Nothing is retried.
    fn send(&self, payload: &[u8], dest: SocketAddr) -> Result<(), CrawlerError>;

    /// [`send`][Self::send], logging and swallowing any failure.
    ///
    /// Returns `true` if the datagram was handed to the OS.
    fn deliver(&self, payload: &[u8], dest: SocketAddr) -> bool {
        match self.send(payload, dest) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "crawler::net", error = %e, "send failed");
                false
            }
        }
    }
}

/// UDP implementation of [`Outbound`].
///
/// [`UdpOutbound::ephemeral`] opens and closes a throwaway socket per call,
/// which is what the command path uses for its rare replies.
/// [`UdpOutbound::dedicated`] keeps one unbound-port socket for the lifetime
/// of the value, which suits the stream worker's steady frame traffic.
#[derive(Debug)]
pub struct UdpOutbound {
    socket: Option<UdpSocket>,
}

impl UdpOutbound {
    /// A sender that uses a fresh socket for every datagram.
    pub fn ephemeral() -> Self {
        Self { socket: None }
    }

    /// A sender that owns one socket, bound to an ephemeral IPv4 port.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Transport`] if the socket cannot be created.
    pub fn dedicated() -> Result<Self, CrawlerError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .map_err(|e| CrawlerError::Transport(format!("outbound socket: {e}")))?;
        Ok(Self {
            socket: Some(socket),
        })
    }

    fn throwaway_for(dest: SocketAddr) -> std::io::Result<UdpSocket> {
        if dest.is_ipv4() {
            UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0))
        }
    }
}

impl Outbound for UdpOutbound {
    fn send(&self, payload: &[u8], dest: SocketAddr) -> Result<(), CrawlerError> {
        let failure = |details: String| CrawlerError::SendFailure { dest, details };

        if payload.len() > MAX_DATAGRAM_BYTES {
            return Err(failure(format!(
                "payload of {} bytes exceeds the {MAX_DATAGRAM_BYTES}-byte datagram limit",
                payload.len()
            )));
        }

        let sent = match &self.socket {
            Some(socket) => socket.send_to(payload, dest),
            None => Self::throwaway_for(dest).and_then(|socket| socket.send_to(payload, dest)),
        }
        .map_err(|e| failure(e.to_string()))?;

        trace!(target: "crawler::net", %dest, bytes = sent, "datagram sent");
        Ok(())
    }
}
