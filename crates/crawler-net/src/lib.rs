//! `crawler-net` – datagram transport for the control channel.
//!
//! One datagram is one command (UTF-8 text) or one stream frame (an encoded
//! image).  There is no framing beyond the datagram itself.
//!
//! # Modules
//!
//! - [`transport`] – [`UdpTransport`]: the bound command socket.  Receives
//!   with an idle timeout and polls a shutdown flag so an interrupt is
//!   noticed while waiting.
//! - [`outbound`] – [`Outbound`] / [`UdpOutbound`]: unicast sends that never
//!   share a socket with the receive path, and whose failures are logged
//!   rather than propagated.

pub mod outbound;
pub mod transport;

pub use outbound::{MAX_DATAGRAM_BYTES, Outbound, UdpOutbound};
pub use transport::{COMMAND_BUFFER_BYTES, DEFAULT_PORT, Received, UdpTransport};
