//! Send-side sliding-window state machine.
//!
//! [`SendWindow`] tracks every transmitted-but-not-yet-slid-past segment for
//! one transfer session.
//!
//! # Protocol contract
//!
//! - Sequence numbers index **segments**, not bytes, and start at
//!   [`INITIAL_SEQ`].  Sessions move a bounded segment count, so wraparound
//!   is not modeled.
//! - The window is bounded by **bytes**: the summed payload length of
//!   unacknowledged segments never exceeds the configured capacity.
//! - ACKs are **cumulative and inclusive**: `ack = K` means every segment
//!   numbered `≤ K` was accepted in order.
//! - On timeout the caller retransmits **all** unacked segments in ascending
//!   sequence order (go-back-N); on a duplicate-ACK burst it retransmits one
//!   targeted segment.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::packet::{Packet, PacketKind, INITIAL_SEQ};

// ---------------------------------------------------------------------------
// OutstandingSegment
// ---------------------------------------------------------------------------

/// A transmitted segment still inside the window.
#[derive(Debug, Clone)]
pub struct OutstandingSegment {
    /// Payload bytes, kept for retransmission.
    pub payload: Vec<u8>,
    /// Time of the most recent (re)transmission; RTT is measured from here.
    pub sent_at: Instant,
    /// First byte of the overall stream this segment covers (inclusive).
    pub start_byte: u64,
    /// Last byte of the overall stream this segment covers (inclusive).
    pub end_byte: u64,
    /// Set once a cumulative ACK covered this segment.
    pub acked: bool,
    /// Number of retransmissions (0 for a segment sent exactly once).
    pub retries: u32,
}

// ---------------------------------------------------------------------------
// Ack outcome
// ---------------------------------------------------------------------------

/// One segment newly covered by a cumulative ACK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckedSegment {
    pub seq: u32,
    pub start_byte: u64,
    pub end_byte: u64,
    /// Elapsed time since the segment's most recent transmission.
    pub rtt: Duration,
}

/// Everything one cumulative ACK changed.
#[derive(Debug)]
pub struct AckOutcome {
    /// Segments this ACK acknowledged for the first time, ascending.
    pub newly_acked: Vec<AckedSegment>,
    /// `true` when the window base moved (the oldest outstanding segment
    /// changed, so the retransmission timer must be reset).
    pub base_advanced: bool,
}

// ---------------------------------------------------------------------------
// SendWindow
// ---------------------------------------------------------------------------

/// Sliding-window send state for one session.
///
/// # Sequence-number layout
///
/// ```text
///  seq_base           next_seq
///      │                  │
///  ────┼──────────────────┼──────────────────▶ segment index
///      │ ◀─ outstanding ─▶│ ◀─ not yet built
/// ```
#[derive(Debug)]
pub struct SendWindow {
    /// Oldest unacknowledged sequence number (left window edge).
    seq_base: u32,
    /// Sequence number the next new segment will take.
    next_seq: u32,
    /// Stream offset the next new segment starts at.
    byte_cursor: u64,
    /// Maximum bytes of unacknowledged payload in flight.
    capacity: usize,
    /// Outstanding segments keyed by sequence number (ascending iteration
    /// gives the go-back-N retransmission order for free).
    segments: BTreeMap<u32, OutstandingSegment>,
}

impl SendWindow {
    /// Create an empty window with the given byte capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            seq_base: INITIAL_SEQ,
            next_seq: INITIAL_SEQ,
            byte_cursor: 0,
            capacity,
            segments: BTreeMap::new(),
        }
    }

    pub fn seq_base(&self) -> u32 {
        self.seq_base
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Stream offset the next new segment will start at.
    pub fn byte_cursor(&self) -> u64 {
        self.byte_cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of segments handed out so far (acknowledged or not).
    pub fn segments_started(&self) -> u32 {
        self.next_seq - INITIAL_SEQ
    }

    /// Summed payload bytes of unacknowledged segments.
    pub fn usage(&self) -> usize {
        self.segments
            .values()
            .filter(|seg| !seg.acked)
            .map(|seg| seg.payload.len())
            .sum()
    }

    /// Number of segments currently inside the window.
    pub fn in_flight(&self) -> usize {
        self.segments.len()
    }

    /// `true` while any transmitted segment has not been slid past.
    pub fn has_outstanding(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Build a DATA packet carrying `payload` under the next sequence number.
    ///
    /// Call [`record_sent`](Self::record_sent) immediately after transmitting
    /// it to place the segment into the window.
    pub fn build_data_packet(&self, payload: Vec<u8>) -> Packet {
        Packet::data(self.next_seq, payload)
    }

    /// Place a just-transmitted DATA packet into the window, advancing
    /// `next_seq` and the byte cursor.
    ///
    /// # Panics
    ///
    /// Panics in debug mode when the packet is not the one
    /// [`build_data_packet`](Self::build_data_packet) produced next, or when
    /// its payload would push unacknowledged usage past the capacity.
    pub fn record_sent(&mut self, packet: Packet, now: Instant) {
        debug_assert_eq!(
            packet.header.seq, self.next_seq,
            "record_sent expects the packet built for next_seq"
        );
        debug_assert_eq!(packet.header.kind, PacketKind::Data);
        debug_assert!(
            self.usage() + packet.payload.len() <= self.capacity,
            "record_sent would exceed window capacity ({} + {} > {})",
            self.usage(),
            packet.payload.len(),
            self.capacity
        );

        let payload = packet.payload;
        let len = payload.len() as u64;
        let start_byte = self.byte_cursor;
        self.segments.insert(
            self.next_seq,
            OutstandingSegment {
                payload,
                sent_at: now,
                start_byte,
                end_byte: start_byte + len.saturating_sub(1),
                acked: false,
                retries: 0,
            },
        );
        self.byte_cursor += len;
        self.next_seq += 1;
    }

    /// Process a cumulative ACK covering every segment numbered `≤ ack`.
    ///
    /// Marks newly covered segments (capturing one RTT sample each, measured
    /// from the most recent transmission), then slides the base past every
    /// acknowledged segment.  A stale ACK (`ack < seq_base`) changes nothing.
    pub fn on_ack(&mut self, ack: u32, now: Instant) -> AckOutcome {
        let mut newly_acked = Vec::new();
        for (&seq, seg) in self.segments.range_mut(..=ack) {
            if seg.acked {
                continue;
            }
            seg.acked = true;
            newly_acked.push(AckedSegment {
                seq,
                start_byte: seg.start_byte,
                end_byte: seg.end_byte,
                rtt: now.duration_since(seg.sent_at),
            });
        }

        let mut base_advanced = false;
        while self
            .segments
            .get(&self.seq_base)
            .is_some_and(|seg| seg.acked)
        {
            self.segments.remove(&self.seq_base);
            self.seq_base += 1;
            base_advanced = true;
        }

        AckOutcome {
            newly_acked,
            base_advanced,
        }
    }

    /// Timeout sweep: refresh and return every unacked segment's packet in
    /// ascending sequence order (the go-back-N step).
    ///
    /// Each swept segment's `sent_at` is reset to `now` and its retry count
    /// incremented; the caller transmits the returned packets and counts
    /// them as retransmissions.
    pub fn sweep_unacked(&mut self, now: Instant) -> Vec<Packet> {
        let mut resends = Vec::new();
        for (&seq, seg) in self.segments.iter_mut() {
            if seg.acked {
                continue;
            }
            seg.sent_at = now;
            seg.retries += 1;
            resends.push(Packet::data(seq, seg.payload.clone()));
        }
        resends
    }

    /// Targeted retransmission of a single segment (the fast-retransmit
    /// step).  Returns `None` when `seq` is not outstanding or already
    /// acknowledged.
    pub fn retransmit(&mut self, seq: u32, now: Instant) -> Option<Packet> {
        let seg = self.segments.get_mut(&seq).filter(|seg| !seg.acked)?;
        seg.sent_at = now;
        seg.retries += 1;
        Some(Packet::data(seq, seg.payload.clone()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn send_one(w: &mut SendWindow, len: usize, at: Instant) -> u32 {
        let seq = w.next_seq();
        let pkt = w.build_data_packet(vec![0u8; len]);
        w.record_sent(pkt, at);
        seq
    }

    #[test]
    fn initial_state() {
        let w = SendWindow::new(400);
        assert_eq!(w.seq_base(), INITIAL_SEQ);
        assert_eq!(w.next_seq(), INITIAL_SEQ);
        assert_eq!(w.segments_started(), 0);
        assert_eq!(w.usage(), 0);
        assert!(!w.has_outstanding());
    }

    #[test]
    fn record_sent_tracks_bytes_and_sequence() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        send_one(&mut w, 40, now);
        send_one(&mut w, 60, now);

        assert_eq!(w.next_seq(), 3);
        assert_eq!(w.segments_started(), 2);
        assert_eq!(w.usage(), 100);
        assert_eq!(w.byte_cursor(), 100);

        let first = &w.segments[&1];
        let second = &w.segments[&2];
        assert_eq!((first.start_byte, first.end_byte), (0, 39));
        assert_eq!((second.start_byte, second.end_byte), (40, 99));
    }

    #[test]
    fn build_data_packet_uses_next_seq() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        send_one(&mut w, 50, now);
        let pkt = w.build_data_packet(vec![0u8; 40]);
        assert_eq!(pkt.header.seq, 2);
        assert_eq!(pkt.header.length, 40);
    }

    #[test]
    fn cumulative_ack_slides_past_covered_segments() {
        let mut w = SendWindow::new(400);
        let sent = Instant::now();
        for _ in 0..3 {
            send_one(&mut w, 50, sent);
        }

        let outcome = w.on_ack(2, sent + Duration::from_millis(20));
        assert_eq!(outcome.newly_acked.len(), 2);
        assert!(outcome.base_advanced);
        assert_eq!(
            outcome.newly_acked.iter().map(|a| a.seq).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(w.seq_base(), 3);
        assert_eq!(w.in_flight(), 1);
        assert_eq!(w.usage(), 50);
    }

    #[test]
    fn stale_ack_changes_nothing() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        send_one(&mut w, 50, now);
        send_one(&mut w, 50, now);
        w.on_ack(2, now);
        assert_eq!(w.seq_base(), 3);

        let outcome = w.on_ack(2, now);
        assert!(outcome.newly_acked.is_empty());
        assert!(!outcome.base_advanced);
        assert_eq!(w.seq_base(), 3);
    }

    #[test]
    fn ack_zero_is_harmless() {
        let mut w = SendWindow::new(400);
        send_one(&mut w, 50, Instant::now());
        let outcome = w.on_ack(0, Instant::now());
        assert!(outcome.newly_acked.is_empty());
        assert!(!outcome.base_advanced);
        assert_eq!(w.seq_base(), 1);
    }

    #[test]
    fn rtt_measured_from_most_recent_transmission() {
        let mut w = SendWindow::new(400);
        let t0 = Instant::now();
        send_one(&mut w, 50, t0);

        // A timeout sweep refreshes the send timestamp.
        let t1 = t0 + Duration::from_millis(300);
        w.sweep_unacked(t1);

        let t2 = t1 + Duration::from_millis(25);
        let outcome = w.on_ack(1, t2);
        assert_eq!(outcome.newly_acked[0].rtt, Duration::from_millis(25));
    }

    #[test]
    fn ack_outcome_carries_byte_ranges() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        send_one(&mut w, 40, now);
        send_one(&mut w, 80, now);

        let outcome = w.on_ack(2, now + Duration::from_millis(5));
        assert_eq!(
            (outcome.newly_acked[1].start_byte, outcome.newly_acked[1].end_byte),
            (40, 119)
        );
    }

    #[test]
    fn sweep_retransmits_all_unacked_in_ascending_order() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        for _ in 0..3 {
            send_one(&mut w, 50, now);
        }
        w.on_ack(1, now);

        let later = now + Duration::from_millis(400);
        let resends = w.sweep_unacked(later);
        let seqs: Vec<u32> = resends.iter().map(|p| p.header.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert_eq!(w.segments[&2].retries, 1);
        assert_eq!(w.segments[&2].sent_at, later);
        assert_eq!(w.segments[&3].retries, 1);
    }

    #[test]
    fn repeated_sweeps_keep_counting_retries() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        send_one(&mut w, 50, now);
        w.sweep_unacked(now + Duration::from_millis(300));
        w.sweep_unacked(now + Duration::from_millis(600));
        assert_eq!(w.segments[&1].retries, 2);
    }

    #[test]
    fn targeted_retransmit_touches_only_that_segment() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        send_one(&mut w, 50, now);
        send_one(&mut w, 50, now);

        let later = now + Duration::from_millis(100);
        let pkt = w.retransmit(2, later).unwrap();
        assert_eq!(pkt.header.seq, 2);
        assert_eq!(w.segments[&2].retries, 1);
        assert_eq!(w.segments[&2].sent_at, later);
        assert_eq!(w.segments[&1].retries, 0);
        assert_eq!(w.segments[&1].sent_at, now);
    }

    #[test]
    fn retransmit_of_unknown_or_acked_segment_returns_none() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        send_one(&mut w, 50, now);
        assert!(w.retransmit(7, now).is_none());

        w.on_ack(1, now);
        assert!(w.retransmit(1, now).is_none());
    }

    #[test]
    fn usage_counts_only_unacked_payload() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        for _ in 0..4 {
            send_one(&mut w, 60, now);
        }
        assert_eq!(w.usage(), 240);
        w.on_ack(3, now);
        assert_eq!(w.usage(), 60);
        assert_eq!(w.seq_base(), 4);
    }

    #[test]
    fn base_never_moves_backwards() {
        let mut w = SendWindow::new(400);
        let now = Instant::now();
        for _ in 0..3 {
            send_one(&mut w, 50, now);
        }
        w.on_ack(2, now);
        let base = w.seq_base();
        w.on_ack(1, now);
        w.on_ack(0, now);
        assert!(w.seq_base() >= base);
    }
}
