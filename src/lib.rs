//! `arq-over-udp` — reliable, ordered byte transfer over UDP.
//!
//! A minimal TCP-like transport: connection handshake, byte-capacity
//! sliding window, cumulative acknowledgments, go-back-N timeout
//! retransmission, duplicate-ACK fast retransmit, and an adaptive
//! retransmission timeout derived from measured round-trip times.
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────────┐    DATA segments    ┌────────────────┐
//!  │ client Session │────────────────────▶│     Server     │
//!  │ window · timer │                     │  peer table +  │
//!  │ dup-ack state  │◀────────────────────│  ACK generator │
//!  └───────┬────────┘   cumulative ACKs   └───────┬────────┘
//!          │                                      │
//!  ┌───────▼────────┐  raw UDP datagrams  ┌───────▼────────┐
//!  │     Socket     │◀───────────────────▶│     Socket     │
//!  └────────────────┘                     └────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]   — datagram kinds and the 12-byte wire header
//! - [`socket`]   — packet-oriented UDP endpoint
//! - [`window`]   — send-side sliding-window state machine
//! - [`dup_ack`]  — duplicate-ACK counting for fast retransmit
//! - [`timer`]    — polled retransmission deadline + adaptive timeout
//! - [`payload`]  — synthetic segment payloads
//! - [`client`]   — handshake + session driver
//! - [`peer`]     — server-side per-address connection tracking
//! - [`server`]   — concurrent datagram server / ACK generation
//! - [`config`]   — tuning knobs for both sides
//! - [`report`]   — end-of-session statistics

pub mod client;
pub mod config;
pub mod dup_ack;
pub mod packet;
pub mod payload;
pub mod peer;
pub mod report;
pub mod server;
pub mod socket;
pub mod timer;
pub mod window;
