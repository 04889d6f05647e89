//! Concurrent datagram server: handshake tracking and ACK generation.
//!
//! The receive loop decodes each datagram and dispatches one handler task
//! per packet; handlers share the socket and the peer table through `Arc`.
//! Loss simulation happens here, on the receive path: an accepted DATA
//! packet may be silently discarded before it reaches the peer table, which
//! to the client is indistinguishable from the network dropping it.
//!
//! The server never times anything out and never tears a connection down;
//! recovery is entirely the client's job.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::config::ServerConfig;
use crate::packet::{Packet, PacketKind};
use crate::peer::{DataVerdict, PeerTable};
use crate::socket::{Socket, SocketError};

/// The listening side of the protocol.
pub struct Server {
    socket: Arc<Socket>,
    peers: Arc<PeerTable>,
    cfg: ServerConfig,
}

impl Server {
    /// Bind the listening socket.
    pub async fn bind(cfg: ServerConfig) -> Result<Self, SocketError> {
        let socket = Socket::bind(cfg.bind_addr).await?;
        log::info!("[server] listening on {}", socket.local_addr());
        Ok(Self {
            socket: Arc::new(socket),
            peers: Arc::new(PeerTable::new()),
            cfg,
        })
    }

    /// Actual bound address (differs from the configured one when binding
    /// port 0 for tests).
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }

    /// Receive loop: one handler task per datagram.  Malformed datagrams
    /// and transient receive failures are logged and skipped; the loop
    /// itself never returns.
    pub async fn run(self) {
        loop {
            match self.socket.recv_from().await {
                Ok((pkt, addr)) => {
                    let socket = Arc::clone(&self.socket);
                    let peers = Arc::clone(&self.peers);
                    let drop_rate = self.cfg.drop_rate;
                    tokio::spawn(async move {
                        if let Err(e) = handle_packet(socket, peers, drop_rate, pkt, addr).await {
                            log::error!("[server] handler for {addr} failed: {e}");
                        }
                    });
                }
                Err(SocketError::Malformed(e)) => {
                    log::warn!("[server] dropping malformed datagram: {e}");
                }
                Err(SocketError::Io(e)) => {
                    log::error!("[server] recv failed: {e}");
                }
            }
        }
    }
}

/// Handle one decoded datagram from `addr`.
async fn handle_packet(
    socket: Arc<Socket>,
    peers: Arc<PeerTable>,
    drop_rate: f64,
    pkt: Packet,
    addr: SocketAddr,
) -> Result<(), SocketError> {
    match pkt.header.kind {
        PacketKind::Syn => {
            log::info!("[server] ← SYN seq={} from {addr}", pkt.header.seq);
            peers.register(addr);
            let reply = Packet::syn_ack(pkt.header.seq + 1);
            socket.send_to(&reply, addr).await?;
            log::info!("[server] → SYN_ACK ack={} to {addr}", reply.header.ack);
        }
        PacketKind::Ack => {
            log::info!("[server] handshake complete for {addr}");
        }
        PacketKind::Data => {
            if !peers.is_registered(addr) {
                log::warn!("[server] DATA from unknown client {addr}, discarding");
                return Ok(());
            }
            if rand::rng().random::<f64>() < drop_rate {
                log::info!(
                    "[server] simulating loss of DATA seq={} from {addr}",
                    pkt.header.seq
                );
                return Ok(());
            }

            match peers.accept_data(addr, pkt.header.seq) {
                DataVerdict::InOrder { ack } => {
                    log::info!(
                        "[server] ← DATA seq={} len={} from {addr}; → ACK {ack}",
                        pkt.header.seq,
                        pkt.header.length
                    );
                    socket.send_to(&Packet::ack_data(ack, clock_trailer()), addr).await?;
                }
                DataVerdict::OutOfOrder { ack, expected } => {
                    log::info!(
                        "[server] ← DATA seq={} from {addr} out of order (expected {expected}); → ACK {ack}",
                        pkt.header.seq
                    );
                    socket.send_to(&Packet::ack_data(ack, clock_trailer()), addr).await?;
                }
                DataVerdict::UnknownPeer => {
                    log::warn!("[server] DATA from unknown client {addr}, discarding");
                }
            }
        }
        PacketKind::SynAck | PacketKind::AckData => {
            log::debug!("[server] ignoring {:?} from {addr}", pkt.header.kind);
        }
    }
    Ok(())
}

/// Wall-clock `HH:MM:SS` (UTC) trailer for ACK_DATA packets.
///
/// Informational only: it rides after the header with `length = 0` and the
/// client never parses it.
fn clock_trailer() -> Vec<u8> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let (h, m, s) = (secs / 3600 % 24, secs / 60 % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}").into_bytes()
}
