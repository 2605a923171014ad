//! UDP datagram transport with a heartbeat receive timeout.
//!
//! Every receive waits at most the current read timeout. The timeout is
//! normally the heartbeat; [`Transport::extend_timeout`] raises it for one
//! scoped wait and the returned guard puts the heartbeat back on drop.

use crate::error::{LilithError, Result};
use crate::protocol::MAX_DATAGRAM;
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

const RECV_BUFFER: usize = 65_535;

/// A bound UDP socket carrying one UTF-8 message per datagram.
#[derive(Debug)]
pub struct Transport {
    socket: UdpSocket,
    heartbeat: Duration,
    read_timeout: Duration,
}

impl Transport {
    /// Bind `addr` with `heartbeat` as the resting receive timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LilithError::Transport`] if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, heartbeat: Duration) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| LilithError::Transport(format!("bind {addr}: {e}")))?;
        Ok(Self {
            socket,
            heartbeat,
            read_timeout: heartbeat,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| LilithError::Transport(e.to_string()))
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Timeout the next receive will use.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Raise the receive timeout until the returned guard is dropped.
    pub fn extend_timeout(&mut self, timeout: Duration) -> ExtendedTimeout<'_> {
        self.read_timeout = timeout;
        ExtendedTimeout { transport: self }
    }

    /// Wait up to the read timeout for one text datagram.
    ///
    /// Returns `Ok(None)` when nothing arrived in time or the payload was
    /// not UTF-8 (the packet is dropped).
    ///
    /// # Errors
    ///
    /// Returns [`LilithError::Transport`] when the socket reports an error.
    pub async fn recv(&self) -> Result<Option<(String, SocketAddr)>> {
        self.recv_until(Instant::now() + self.read_timeout).await
    }

    /// Like [`recv`](Self::recv) but bounded by an absolute deadline.
    pub async fn recv_until(&self, deadline: Instant) -> Result<Option<(String, SocketAddr)>> {
        let mut buf = vec![0u8; RECV_BUFFER];
        let (len, from) = match tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf))
            .await
        {
            Err(_elapsed) => return Ok(None),
            Ok(Err(e)) => return Err(LilithError::Transport(format!("receive: {e}"))),
            Ok(Ok(received)) => received,
        };
        buf.truncate(len);
        match String::from_utf8(buf) {
            Ok(text) => Ok(Some((text, from))),
            Err(_) => {
                tracing::warn!(peer = %from, bytes = len, "dropping non-UTF-8 datagram");
                Ok(None)
            }
        }
    }

    /// Send `text` as one datagram, cut on a character boundary to fit.
    ///
    /// # Errors
    ///
    /// Returns [`LilithError::Transport`] when the send fails.
    pub async fn send_text(&self, text: &str, to: SocketAddr) -> Result<()> {
        let payload = truncate_to_boundary(text, MAX_DATAGRAM);
        if payload.len() < text.len() {
            tracing::warn!(peer = %to, original = text.len(), "outbound message truncated");
        }
        self.socket
            .send_to(payload.as_bytes(), to)
            .await
            .map_err(|e| LilithError::Transport(format!("send to {to}: {e}")))?;
        Ok(())
    }
}

/// Scoped extended receive timeout; restores the heartbeat on drop.
#[derive(Debug)]
pub struct ExtendedTimeout<'a> {
    transport: &'a mut Transport,
}

impl Deref for ExtendedTimeout<'_> {
    type Target = Transport;

    fn deref(&self) -> &Transport {
        self.transport
    }
}

impl DerefMut for ExtendedTimeout<'_> {
    fn deref_mut(&mut self) -> &mut Transport {
        self.transport
    }
}

impl Drop for ExtendedTimeout<'_> {
    fn drop(&mut self) {
        self.transport.read_timeout = self.transport.heartbeat;
    }
}

/// Longest prefix of `text` that is at most `max_bytes` long and ends on a
/// `char` boundary.
pub fn truncate_to_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
