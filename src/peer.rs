//! Server-side connection tracking.
//!
//! One [`PeerConnection`] per remote address, held in a [`PeerTable`] shared
//! by every datagram handler task.  All reads and transitions go through the
//! table's mutex, so updates to a peer's `expected_seq`/`last_ack` are
//! linearized even when handlers for the same address run concurrently.
//! The critical sections are pure field updates; no I/O happens under the
//! lock.
//!
//! Connections only ever move CLOSED → ESTABLISHED.  There is no teardown:
//! entries live for the server's lifetime, and a repeated SYN resets its
//! peer's state in place so a restarted client can reuse its address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use crate::packet::INITIAL_SEQ;

/// Handshake progress for one remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    /// SYN seen and SYN_ACK sent, final ACK not yet observed.
    AwaitingAck,
    /// Handshake complete; DATA is accepted and acknowledged.
    Established,
}

/// Receive state for one remote address.
#[derive(Debug, Clone)]
pub struct PeerConnection {
    pub status: PeerStatus,
    /// Next in-order sequence number required from this peer.
    pub expected_seq: u32,
    /// Most recently accepted sequence number (the cumulative ACK to repeat
    /// for out-of-order arrivals; `0` until the first segment lands).
    pub last_ack: u32,
}

/// What the ACK generator should do with a DATA segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataVerdict {
    /// The expected segment arrived; state advanced.  Acknowledge its seq.
    InOrder { ack: u32 },
    /// Out-of-order (or duplicate) arrival; state unchanged.  Repeat the
    /// previous cumulative acknowledgment.
    OutOfOrder { ack: u32, expected: u32 },
    /// No handshake on record for this address.
    UnknownPeer,
}

/// Mutex-serialized table of peer connections, shared across handler tasks.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: Mutex<HashMap<SocketAddr, PeerConnection>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// SYN handler: create the peer's entry, or reset an existing one back
    /// to a fresh session.
    ///
    /// The final handshake ACK carries no state of its own, so the entry is
    /// established as soon as the SYN_ACK goes out.
    pub fn register(&self, addr: SocketAddr) {
        self.peers.lock().unwrap().insert(
            addr,
            PeerConnection {
                status: PeerStatus::Established,
                expected_seq: INITIAL_SEQ,
                last_ack: 0,
            },
        );
    }

    /// `true` once `addr` has completed a handshake.
    pub fn is_registered(&self, addr: SocketAddr) -> bool {
        self.peers.lock().unwrap().contains_key(&addr)
    }

    /// DATA handler: advance on the expected sequence number, otherwise
    /// repeat the last good cumulative ACK.
    pub fn accept_data(&self, addr: SocketAddr, seq: u32) -> DataVerdict {
        let mut peers = self.peers.lock().unwrap();
        match peers.get_mut(&addr) {
            None => DataVerdict::UnknownPeer,
            Some(peer) if seq == peer.expected_seq => {
                peer.expected_seq += 1;
                peer.last_ack = seq;
                DataVerdict::InOrder { ack: seq }
            }
            Some(peer) => DataVerdict::OutOfOrder {
                ack: peer.last_ack,
                expected: peer.expected_seq,
            },
        }
    }

    /// Snapshot of one peer's state.
    pub fn peer(&self, addr: SocketAddr) -> Option<PeerConnection> {
        self.peers.lock().unwrap().get(&addr).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn register_initialises_fresh_state() {
        let table = PeerTable::new();
        table.register(addr(9000));

        let peer = table.peer(addr(9000)).unwrap();
        assert_eq!(peer.status, PeerStatus::Established);
        assert_eq!(peer.expected_seq, INITIAL_SEQ);
        assert_eq!(peer.last_ack, 0);
        assert!(table.is_registered(addr(9000)));
        assert!(!table.is_registered(addr(9001)));
    }

    #[test]
    fn in_order_data_advances_by_exactly_one() {
        let table = PeerTable::new();
        table.register(addr(9000));

        assert_eq!(
            table.accept_data(addr(9000), 1),
            DataVerdict::InOrder { ack: 1 }
        );
        let peer = table.peer(addr(9000)).unwrap();
        assert_eq!(peer.expected_seq, 2);
        assert_eq!(peer.last_ack, 1);
    }

    #[test]
    fn out_of_order_data_repeats_last_ack_without_advancing() {
        let table = PeerTable::new();
        table.register(addr(9000));
        table.accept_data(addr(9000), 1);
        table.accept_data(addr(9000), 2);

        // Segment 3 lost; 4 arrives early.
        assert_eq!(
            table.accept_data(addr(9000), 4),
            DataVerdict::OutOfOrder {
                ack: 2,
                expected: 3
            }
        );
        let peer = table.peer(addr(9000)).unwrap();
        assert_eq!(peer.expected_seq, 3);
        assert_eq!(peer.last_ack, 2);
    }

    #[test]
    fn duplicate_data_is_out_of_order() {
        let table = PeerTable::new();
        table.register(addr(9000));
        table.accept_data(addr(9000), 1);

        assert_eq!(
            table.accept_data(addr(9000), 1),
            DataVerdict::OutOfOrder {
                ack: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn before_first_segment_out_of_order_acks_zero() {
        let table = PeerTable::new();
        table.register(addr(9000));

        // Nothing accepted yet, so the repeated cumulative ack is the
        // "nothing useful" sentinel.
        assert_eq!(
            table.accept_data(addr(9000), 5),
            DataVerdict::OutOfOrder {
                ack: 0,
                expected: 1
            }
        );
    }

    #[test]
    fn data_from_unknown_address_is_rejected() {
        let table = PeerTable::new();
        assert_eq!(table.accept_data(addr(9000), 1), DataVerdict::UnknownPeer);
    }

    #[test]
    fn repeated_syn_resets_the_session() {
        let table = PeerTable::new();
        table.register(addr(9000));
        table.accept_data(addr(9000), 1);
        table.accept_data(addr(9000), 2);

        table.register(addr(9000));
        let peer = table.peer(addr(9000)).unwrap();
        assert_eq!(peer.expected_seq, INITIAL_SEQ);
        assert_eq!(peer.last_ack, 0);
    }
}
