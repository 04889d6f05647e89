//! Tuning knobs for both sides of the protocol.
//!
//! Defaults match the documented protocol parameters; tests override
//! individual fields (ephemeral bind ports, loss on/off, shorter sessions).

use std::net::SocketAddr;
use std::time::Duration;

/// UDP port the server binds by default.
pub const DEFAULT_PORT: u16 = 8888;

/// Client-side transfer parameters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum bytes of unacknowledged payload in flight.
    pub window_capacity: usize,
    /// Smallest payload length a segment may carry.
    pub min_payload: usize,
    /// Largest payload length a segment may carry.
    pub max_payload: usize,
    /// Retransmission timeout used until enough RTT samples exist, and the
    /// handshake wait.
    pub initial_timeout: Duration,
    /// Bounded wait for one acknowledgment per loop iteration.
    pub poll_timeout: Duration,
    /// Duplicate-ACK count that triggers a fast retransmit.
    pub dup_ack_threshold: u32,
    /// Number of segments one session transfers.
    pub total_segments: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            window_capacity: 400,
            min_payload: 40,
            max_payload: 80,
            initial_timeout: Duration::from_millis(300),
            poll_timeout: Duration::from_millis(50),
            dup_ack_threshold: 3,
            total_segments: 30,
        }
    }
}

/// Server-side parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listening socket binds.
    pub bind_addr: SocketAddr,
    /// Probability that an accepted DATA packet is silently discarded.
    pub drop_rate: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            drop_rate: 0.3,
        }
    }
}
