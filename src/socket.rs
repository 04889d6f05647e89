//! Packet-oriented UDP endpoint.
//!
//! Both sides of the protocol move [`Packet`]s, never raw bytes; [`Socket`]
//! owns that translation at the datagram boundary.  Encoding cannot fail, so
//! sending is pure I/O; receiving decodes in place and surfaces undecodable
//! datagrams as [`SocketError::Malformed`] for the caller to drop or log
//! (the protocol never escalates them).

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Packet, PacketError};

/// Largest datagram a peer will ever send: a 12-byte header plus a payload
/// capped well below this by the window configuration.
const RECV_BUFFER: usize = 1024;

/// Failure at the datagram boundary.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("undecodable datagram: {0}")]
    Malformed(#[from] PacketError),
}

/// A UDP socket that sends and receives [`Packet`]s.
///
/// Methods take `&self`; server handler tasks share one socket via `Arc`.
#[derive(Debug)]
pub struct Socket {
    inner: UdpSocket,
    local_addr: SocketAddr,
}

impl Socket {
    /// Bind to `addr`.  Port `0` asks the OS for an ephemeral port; the
    /// resolved address is available from [`local_addr`](Self::local_addr).
    pub async fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { inner, local_addr })
    }

    /// The address this socket is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send one packet to `dest` as a single datagram.
    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(&packet.encode(), dest).await?;
        Ok(())
    }

    /// Wait for the next datagram and decode it.
    ///
    /// A datagram that does not decode comes back as
    /// [`SocketError::Malformed`]; the socket stays usable.
    pub async fn recv_from(&self) -> Result<(Packet, SocketAddr), SocketError> {
        let mut buf = [0u8; RECV_BUFFER];
        let (n, from) = self.inner.recv_from(&mut buf).await?;
        let packet = Packet::decode(&buf[..n])?;
        Ok((packet, from))
    }
}
