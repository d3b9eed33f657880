//! [`UdpTransport`] – the bound command socket.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crawler_types::CrawlerError;
use tracing::info;

/// Well-known UDP port the crawler listens on.
pub const DEFAULT_PORT: u16 = 23232;

/// Receive buffer for command datagrams.  Longer datagrams are truncated.
pub const COMMAND_BUFFER_BYTES: usize = 1024;

/// How often a blocked [`UdpTransport::receive`] checks the shutdown flag.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of one [`UdpTransport::receive`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A datagram arrived.
    Datagram {
        payload: Vec<u8>,
        sender: SocketAddr,
    },
    /// Nothing arrived within the idle timeout.
    Timeout,
    /// The shutdown flag was raised while waiting.
    Interrupted,
}

/// The crawler's command socket.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::atomic::AtomicBool;
/// use std::time::Duration;
/// use crawler_net::{Received, UdpTransport, DEFAULT_PORT};
///
/// let mut transport = UdpTransport::bind(DEFAULT_PORT, Duration::from_secs(120)).unwrap();
/// let shutdown = AtomicBool::new(false);
/// match transport.receive(&shutdown).unwrap() {
///     Received::Datagram { payload, sender } => println!("{sender}: {payload:?}"),
///     Received::Timeout => println!("idle"),
///     Received::Interrupted => println!("shutting down"),
/// }
/// ```
pub struct UdpTransport {
    socket: UdpSocket,
    idle_timeout: Duration,
    poll_interval: Duration,
    buf: [u8; COMMAND_BUFFER_BYTES],
}

impl UdpTransport {
    /// Bind to `0.0.0.0:port`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Transport`] if the port cannot be bound.
    pub fn bind(port: u16, idle_timeout: Duration) -> Result<Self, CrawlerError> {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), idle_timeout)
    }

    /// Bind to an explicit address (tests bind `127.0.0.1:0`).
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Transport`] if the address cannot be bound.
    pub fn bind_addr(addr: SocketAddr, idle_timeout: Duration) -> Result<Self, CrawlerError> {
        let socket = UdpSocket::bind(addr)
            .map_err(|e| CrawlerError::Transport(format!("bind error on {addr}: {e}")))?;
        let local = socket.local_addr().unwrap_or(addr);
        info!(target: "crawler::net", addr = %local, timeout_secs = idle_timeout.as_secs(), "listening");
        Ok(Self {
            socket,
            idle_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            buf: [0u8; COMMAND_BUFFER_BYTES],
        })
    }

    /// Override how often the shutdown flag is checked (builder-style).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        if !poll_interval.is_zero() {
            self.poll_interval = poll_interval;
        }
        self
    }

    /// The address the socket is actually bound to.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Transport`] if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, CrawlerError> {
        self.socket
            .local_addr()
            .map_err(|e| CrawlerError::Transport(format!("local_addr: {e}")))
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Block until a datagram arrives, the idle timeout elapses, or
    /// `shutdown` is raised.
    ///
    /// The idle timeout counts from the start of this call.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Transport`] for socket errors other than the
    /// read timing out.  The caller decides whether to keep receiving.
    pub fn receive(&mut self, shutdown: &AtomicBool) -> Result<Received, CrawlerError> {
        let deadline = Instant::now() + self.idle_timeout;
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return Ok(Received::Interrupted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Received::Timeout);
            }
            self.socket
                .set_read_timeout(Some(remaining.min(self.poll_interval)))
                .map_err(|e| CrawlerError::Transport(format!("set_read_timeout: {e}")))?;

            match self.socket.recv_from(&mut self.buf) {
                Ok((n, sender)) => {
                    return Ok(Received::Datagram {
                        payload: self.buf[..n].to_vec(),
                        sender,
                    });
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => return Err(CrawlerError::Transport(format!("recv_from: {e}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn loopback(idle_timeout: Duration) -> UdpTransport {
        UdpTransport::bind_addr("127.0.0.1:0".parse().unwrap(), idle_timeout)
            .unwrap()
            .with_poll_interval(Duration::from_millis(20))
    }

    #[test]
    fn receives_datagram_with_sender() {
        let mut transport = loopback(Duration::from_secs(5));
        let addr = transport.local_addr().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(b"connect", addr).unwrap();

        let shutdown = AtomicBool::new(false);
        match transport.receive(&shutdown).unwrap() {
            Received::Datagram { payload, sender } => {
                assert_eq!(payload, b"connect");
                assert_eq!(sender, client.local_addr().unwrap());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn times_out_when_idle() {
        let mut transport = loopback(Duration::from_millis(60));
        let shutdown = AtomicBool::new(false);
        let start = Instant::now();
        assert_eq!(transport.receive(&shutdown).unwrap(), Received::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn shutdown_interrupts_receive() {
        let mut transport = loopback(Duration::from_secs(30));
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let raiser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
        });

        let start = Instant::now();
        assert_eq!(transport.receive(&shutdown).unwrap(), Received::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(5));
        raiser.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn oversized_command_is_truncated_to_buffer() {
        let mut transport = loopback(Duration::from_secs(5));
        let addr = transport.local_addr().unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(&[b'a'; 2000], addr).unwrap();

        let shutdown = AtomicBool::new(false);
        match transport.receive(&shutdown).unwrap() {
            Received::Datagram { payload, .. } => assert!(payload.len() <= COMMAND_BUFFER_BYTES),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn binding_a_taken_port_is_a_transport_error() {
        let first = loopback(Duration::from_secs(1));
        let addr = first.local_addr().unwrap();
        let second = UdpTransport::bind_addr(addr, Duration::from_secs(1));
        assert!(matches!(second, Err(CrawlerError::Transport(_))));
    }
}
