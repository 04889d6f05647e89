//! Client session driver: handshake, transfer loop, summary.
//!
//! # Architecture
//!
//! ```text
//!  Session::run (one task, no shared state)
//!    ├── fill_window  — synthesize and send new DATA while capacity remains
//!    ├── poll_ack     — bounded wait for one ACK_DATA
//!    │     ├── duplicate-ACK detection  (DupAckCounter → fast retransmit)
//!    │     └── cumulative processing    (SendWindow::on_ack → slide, RTT)
//!    └── check_timer  — polled deadline → go-back-N sweep
//! ```
//!
//! The receive step waits at most [`ClientConfig::poll_timeout`] so the loop
//! stays responsive to the retransmission deadline; an empty poll is a normal
//! outcome, not an error.  All state lives inside [`Session`] and is mutated
//! synchronously between polls.

use std::net::SocketAddr;
use std::time::Instant;

use rand::Rng;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::ClientConfig;
use crate::dup_ack::DupAckCounter;
use crate::packet::{Packet, PacketKind, INITIAL_SEQ};
use crate::payload;
use crate::report::SessionReport;
use crate::socket::{Socket, SocketError};
use crate::timer::{RetransmitTimer, RttEstimator};
use crate::window::SendWindow;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Ways a client session can fail.
///
/// Handshake failures are fatal; there is no handshake retry.  Once the
/// transfer loop runs, only socket I/O failures end the session early.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("handshake timed out waiting for SYN_ACK")]
    HandshakeTimeout,
    #[error("handshake rejected: expected ack {expected}, got {got}")]
    HandshakeRejected { expected: u32, got: u32 },
    #[error("socket failure: {0}")]
    Socket(#[from] SocketError),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One client-side transfer session.
///
/// Obtain an established session via [`Session::connect`], then drive it to
/// completion with [`Session::run`].
#[derive(Debug)]
pub struct Session {
    socket: Socket,
    server: SocketAddr,
    cfg: ClientConfig,
    window: SendWindow,
    dup_acks: DupAckCounter,
    timer: RetransmitTimer,
    rtt: RttEstimator,
    acked_count: u64,
    retransmit_count: u64,
}

impl Session {
    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Three-way handshake: SYN → SYN_ACK → ACK.
    ///
    /// Fails with [`SessionError::HandshakeTimeout`] when no reply arrives
    /// within the initial timeout, and with
    /// [`SessionError::HandshakeRejected`] when the reply does not
    /// acknowledge our initial sequence number — in that case no ACK is sent
    /// and the connection is not established.
    pub async fn connect(
        socket: Socket,
        server: SocketAddr,
        cfg: ClientConfig,
    ) -> Result<Self, SessionError> {
        let isn = INITIAL_SEQ;
        let expected = isn + 1;

        log::info!("[handshake] → SYN seq={isn} to {server}");
        socket.send_to(&Packet::syn(isn), server).await?;

        let (reply, _) = match timeout(cfg.initial_timeout, socket.recv_from()).await {
            Err(_elapsed) => return Err(SessionError::HandshakeTimeout),
            Ok(received) => received?,
        };

        match reply.header.kind {
            PacketKind::SynAck if reply.header.ack == expected => {}
            _ => {
                return Err(SessionError::HandshakeRejected {
                    expected,
                    got: reply.header.ack,
                })
            }
        }

        // Complete the handshake by acknowledging the server's sequence number.
        let ack = reply.header.seq + 1;
        socket.send_to(&Packet::ack(ack, ack), server).await?;
        log::info!("[handshake] established with {server}");

        Ok(Self {
            socket,
            server,
            window: SendWindow::new(cfg.window_capacity),
            dup_acks: DupAckCounter::new(),
            timer: RetransmitTimer::new(),
            rtt: RttEstimator::new(cfg.initial_timeout),
            cfg,
            acked_count: 0,
            retransmit_count: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Transfer loop
    // -----------------------------------------------------------------------

    /// Drive the transfer until every segment is acknowledged, then hand the
    /// counters and RTT record off as a [`SessionReport`].
    pub async fn run(mut self) -> Result<SessionReport, SessionError> {
        log::info!(
            "[session] transferring {} segments to {}",
            self.cfg.total_segments,
            self.server
        );

        while !self.complete() {
            self.fill_window().await?;
            self.poll_ack().await?;
            self.check_timer().await?;
        }

        log::info!(
            "[session] complete: {} segments acknowledged, {} retransmissions",
            self.acked_count,
            self.retransmit_count
        );
        Ok(SessionReport {
            total_segments: self.cfg.total_segments,
            acked_segments: self.acked_count,
            retransmits: self.retransmit_count,
            rtt_samples: self.rtt.samples().to_vec(),
        })
    }

    fn complete(&self) -> bool {
        self.window.segments_started() >= self.cfg.total_segments
            && !self.window.has_outstanding()
    }

    /// Send fresh segments while the session has more to start and their
    /// payload fits under the unacknowledged-byte capacity.
    async fn fill_window(&mut self) -> Result<(), SessionError> {
        while self.window.segments_started() < self.cfg.total_segments
            && self.window.usage() < self.cfg.window_capacity
        {
            let len = rand::rng().random_range(self.cfg.min_payload..=self.cfg.max_payload);
            if self.window.usage() + len > self.cfg.window_capacity {
                break; // would overflow the window; never split a segment
            }

            let pkt = self.window.build_data_packet(payload::random_block(len));
            self.socket.send_to(&pkt, self.server).await?;
            let start = self.window.byte_cursor();
            log::info!(
                "[session] → DATA seq={} bytes {}..={} in_flight={}",
                pkt.header.seq,
                start,
                start + len as u64 - 1,
                self.window.in_flight() + 1
            );
            self.window.record_sent(pkt, Instant::now());
        }

        if self.window.has_outstanding() && !self.timer.is_running() {
            self.timer.start(Instant::now(), self.rtt.timeout());
        }
        Ok(())
    }

    /// Wait up to the poll timeout for one datagram and process it if it is
    /// an acknowledgment.  Undecodable datagrams are dropped, anything that
    /// is not ACK_DATA is ignored.
    async fn poll_ack(&mut self) -> Result<(), SessionError> {
        let (pkt, _) = match timeout(self.cfg.poll_timeout, self.socket.recv_from()).await {
            Err(_elapsed) => return Ok(()), // nothing arrived — keep looping
            Ok(Err(SocketError::Malformed(e))) => {
                log::debug!("[session] dropping undecodable datagram: {e}");
                return Ok(());
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(received)) => received,
        };

        match pkt.header.kind {
            PacketKind::AckData => self.process_ack(pkt.header.ack).await,
            PacketKind::Syn | PacketKind::SynAck | PacketKind::Ack | PacketKind::Data => {
                log::debug!("[session] ignoring {:?} during transfer", pkt.header.kind);
                Ok(())
            }
        }
    }

    /// Duplicate-ACK detection followed by cumulative processing, both fed
    /// by the same acknowledgment number.
    async fn process_ack(&mut self, ack: u32) -> Result<(), SessionError> {
        if ack == 0 {
            return Ok(()); // sentinel: the server has accepted nothing yet
        }
        let now = Instant::now();

        let dups = self.dup_acks.record(ack);
        if ack < self.window.next_seq() && dups >= self.cfg.dup_ack_threshold {
            let target = ack + 1;
            if let Some(pkt) = self.window.retransmit(target, now) {
                log::info!(
                    "[session] {dups} duplicate ACKs for {ack} — fast retransmit seq={target}"
                );
                self.socket.send_to(&pkt, self.server).await?;
                self.retransmit_count += 1;
            }
            self.dup_acks.reset(ack);
        }

        let outcome = self.window.on_ack(ack, now);
        for seg in &outcome.newly_acked {
            self.rtt.record(seg.rtt);
            log::info!(
                "[session] ← ACK {} (bytes {}..={}) rtt={:.2}ms",
                seg.seq,
                seg.start_byte,
                seg.end_byte,
                seg.rtt.as_secs_f64() * 1000.0
            );
        }
        self.acked_count += outcome.newly_acked.len() as u64;

        if outcome.base_advanced {
            // The oldest outstanding segment changed: stale duplicate counts
            // go away and the deadline belongs to the new base.
            self.dup_acks.prune_below(self.window.seq_base());
            self.timer.stop();
            if self.window.has_outstanding() {
                self.timer.start(now, self.rtt.timeout());
            }
        }
        Ok(())
    }

    /// Polled deadline check; on expiry run the go-back-N sweep.
    async fn check_timer(&mut self) -> Result<(), SessionError> {
        if !self.timer.expired(Instant::now()) {
            return Ok(());
        }
        self.timer.stop();

        let now = Instant::now();
        let resends = self.window.sweep_unacked(now);
        log::info!(
            "[session] timeout — go-back-N retransmitting {} segment(s)",
            resends.len()
        );
        for pkt in resends {
            log::debug!("[session] ↻ DATA seq={} len={}", pkt.header.seq, pkt.header.length);
            self.socket.send_to(&pkt, self.server).await?;
            self.retransmit_count += 1;
        }

        if self.window.has_outstanding() {
            self.timer.start(now, self.rtt.timeout());
        }
        Ok(())
    }
}
