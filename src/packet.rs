//! Datagram kinds and the 12-byte wire header.
//!
//! Everything the client and server exchange is a [`Packet`]: one of five
//! [`PacketKind`]s, three numeric header fields, and whatever bytes follow
//! the header.  This module owns the byte layout and nothing else; sockets
//! move the bytes and the protocol engines interpret them.
//!
//! # Layout
//!
//! Multi-byte fields are big-endian.
//!
//! ```text
//! offset   0        2                6                10        12
//!          ┌────────┬────────────────┬────────────────┬─────────┬─────────────┐
//!          │ kind   │ sequence       │ acknowledgment │ length  │ payload ... │
//!          │ (u16)  │ number (u32)   │ number (u32)   │ (u16)   │             │
//!          └────────┴────────────────┴────────────────┴─────────┴─────────────┘
//! ```
//!
//! The `length` field describes DATA payloads only.  An ACK_DATA datagram
//! declares `length = 0` yet still carries a short human-readable trailer
//! after the header, so [`Packet::decode`] never checks the field against
//! the bytes that actually follow.

/// Bytes occupied by the fixed header on the wire.
pub const HEADER_LEN: usize = 12;

/// First sequence number assigned to payload segments.
///
/// Payload numbering is independent of the handshake sequence numbers: the
/// sender's window and the receiver's in-order tracking both start here.
pub const INITIAL_SEQ: u32 = 1;

// Field offsets inside the serialised header.
const OFF_KIND: usize = 0;
const OFF_SEQ: usize = 2;
const OFF_ACK: usize = 6;
const OFF_LENGTH: usize = 10;

/// The five datagram kinds the protocol exchanges.
///
/// The discriminants are the on-wire `kind` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Handshake initiation from the client.
    Syn = 1,
    /// Server's handshake reply, acknowledging the client's SYN.
    SynAck = 2,
    /// Client's handshake completion notice.
    Ack = 3,
    /// A payload segment.
    Data = 4,
    /// Cumulative acknowledgment of payload segments.
    AckData = 5,
}

impl PacketKind {
    /// Map an on-wire kind code back to a [`PacketKind`].
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(PacketKind::Syn),
            2 => Some(PacketKind::SynAck),
            3 => Some(PacketKind::Ack),
            4 => Some(PacketKind::Data),
            5 => Some(PacketKind::AckData),
            _ => None,
        }
    }
}

/// The fixed header, in host byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Which of the five datagram kinds this is.
    pub kind: PacketKind,
    /// Sequence number (segment index for DATA; handshake counter for SYN/ACK).
    pub seq: u32,
    /// Acknowledgment number (cumulative for ACK_DATA; `0` means "nothing").
    pub ack: u32,
    /// Declared payload length in bytes.
    ///
    /// Matches the payload for DATA packets.  ACK_DATA keeps this at `0`
    /// even when a trailer follows the header.
    pub length: u16,
}

/// One protocol datagram: the header plus every byte after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    fn control(kind: PacketKind, seq: u32, ack: u32) -> Self {
        Packet {
            header: Header {
                kind,
                seq,
                ack,
                length: 0,
            },
            payload: Vec::new(),
        }
    }

    /// Handshake initiation carrying the client's initial sequence number.
    pub fn syn(seq: u32) -> Self {
        Self::control(PacketKind::Syn, seq, 0)
    }

    /// Handshake reply acknowledging a SYN (`ack` = received seq + 1).
    pub fn syn_ack(ack: u32) -> Self {
        Self::control(PacketKind::SynAck, 0, ack)
    }

    /// Handshake completion notice.
    pub fn ack(seq: u32, ack: u32) -> Self {
        Self::control(PacketKind::Ack, seq, ack)
    }

    /// Payload segment; `length` is taken from the payload itself.
    pub fn data(seq: u32, payload: Vec<u8>) -> Self {
        Packet {
            header: Header {
                kind: PacketKind::Data,
                seq,
                ack: 0,
                length: payload.len() as u16,
            },
            payload,
        }
    }

    /// Cumulative acknowledgment of every segment numbered `ack` and below.
    ///
    /// The trailer rides after the header with `length` left at `0`: it is
    /// informational (a wall-clock stamp) and never parsed by the peer.
    pub fn ack_data(ack: u32, trailer: Vec<u8>) -> Self {
        Packet {
            header: Header {
                kind: PacketKind::AckData,
                seq: 0,
                ack,
                length: 0,
            },
            payload: trailer,
        }
    }

    /// Allocate and fill the wire image of this packet.
    ///
    /// `header.length` goes out exactly as stored, never recomputed from the
    /// payload; that is how ACK_DATA trailers travel under a zero length.
    pub fn encode(&self) -> Vec<u8> {
        let mut wire = vec![0u8; HEADER_LEN + self.payload.len()];

        wire[OFF_KIND..OFF_SEQ].copy_from_slice(&(self.header.kind as u16).to_be_bytes());
        wire[OFF_SEQ..OFF_ACK].copy_from_slice(&self.header.seq.to_be_bytes());
        wire[OFF_ACK..OFF_LENGTH].copy_from_slice(&self.header.ack.to_be_bytes());
        wire[OFF_LENGTH..HEADER_LEN].copy_from_slice(&self.header.length.to_be_bytes());
        wire[HEADER_LEN..].copy_from_slice(&self.payload);

        wire
    }

    /// Read a [`Packet`] back out of a received buffer.
    ///
    /// Fails on a buffer shorter than [`HEADER_LEN`] or an unrecognised kind
    /// code.  Everything past the header becomes the payload; the `length`
    /// field is deliberately not validated against it.
    pub fn decode(wire: &[u8]) -> Result<Self, PacketError> {
        if wire.len() < HEADER_LEN {
            return Err(PacketError::Truncated);
        }

        let code = u16::from_be_bytes(wire[OFF_KIND..OFF_SEQ].try_into().unwrap());
        let kind = PacketKind::from_u16(code).ok_or(PacketError::UnknownKind(code))?;
        let seq = u32::from_be_bytes(wire[OFF_SEQ..OFF_ACK].try_into().unwrap());
        let ack = u32::from_be_bytes(wire[OFF_ACK..OFF_LENGTH].try_into().unwrap());
        let length = u16::from_be_bytes(wire[OFF_LENGTH..HEADER_LEN].try_into().unwrap());

        Ok(Packet {
            header: Header {
                kind,
                seq,
                ack,
                length,
            },
            payload: wire[HEADER_LEN..].to_vec(),
        })
    }
}

/// Why a received datagram failed to decode.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketError {
    /// The buffer ended before the header did.
    Truncated,
    /// The kind code is not one of the five known values.
    UnknownKind(u16),
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::Truncated => write!(f, "datagram ends before the 12-byte header does"),
            PacketError::UnknownKind(code) => write!(f, "unrecognised packet kind code {code}"),
        }
    }
}

impl std::error::Error for PacketError {}
