//! Wire-format definitions for SWP packets.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (type tag, sequence number, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`], returning
//!   [`MalformedPacket`] for truncated input or an unknown type tag.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Type tag    |              Sequence Number                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  (seq cont.)  |            Payload (DATA only) ...            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 5 bytes, type(1) + seq(4).

use std::fmt;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 5;

/// Largest payload a single DATA packet may carry.
///
/// Leaves room for IP + UDP + any outer encapsulation under a 1500-byte MTU.
pub const MAX_PAYLOAD: usize = 1400;

/// Largest packet the codec produces.
pub const MAX_PACKET: usize = HEADER_LEN + MAX_PAYLOAD;

const OFF_TYPE: usize = 0;
const OFF_SEQ: usize = 1;

// ---------------------------------------------------------------------------
// PacketType
// ---------------------------------------------------------------------------

/// The one-byte type tag at the start of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Carries a chunk of the application byte stream.
    Data = b'D',
    /// Cumulative acknowledgement; the sequence number is the highest
    /// contiguous chunk the receiver has delivered.
    Ack = b'A',
}

impl PacketType {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = MalformedPacket;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            b'D' => Ok(PacketType::Data),
            b'A' => Ok(PacketType::Ack),
            other => Err(MalformedPacket::UnknownType(other)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::Data => f.write_str("DATA"),
            PacketType::Ack => f.write_str("ACK"),
        }
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A complete SWP datagram: type tag + sequence number + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketType,
    pub seq: u32,
    /// Always empty for [`PacketType::Ack`].
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a DATA packet.
    ///
    /// # Panics
    ///
    /// Panics if `payload` exceeds [`MAX_PAYLOAD`].  Chunking is the caller's
    /// job; an oversize chunk here is a bug, not a network condition.
    pub fn data(seq: u32, payload: Vec<u8>) -> Self {
        assert!(
            payload.len() <= MAX_PAYLOAD,
            "DATA payload of {} bytes exceeds the {MAX_PAYLOAD}-byte maximum",
            payload.len()
        );
        Self {
            kind: PacketType::Data,
            seq,
            payload,
        }
    }

    /// Build an ACK packet acknowledging every sequence number up to and
    /// including `seq`.
    pub fn ack(seq: u32) -> Self {
        Self {
            kind: PacketType::Ack,
            seq,
            payload: Vec::new(),
        }
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let payload: &[u8] = match self.kind {
            PacketType::Data => &self.payload,
            PacketType::Ack => &[],
        };
        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.push(self.kind.tag());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    /// Parse a [`Packet`] from a raw datagram.
    ///
    /// Returns [`Err`] if `buf` is shorter than [`HEADER_LEN`] or the type tag
    /// is not recognised.  Trailing bytes on an ACK are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, MalformedPacket> {
        if buf.len() < HEADER_LEN {
            return Err(MalformedPacket::TooShort(buf.len()));
        }

        let kind = PacketType::try_from(buf[OFF_TYPE])?;
        let seq = u32::from_be_bytes([
            buf[OFF_SEQ],
            buf[OFF_SEQ + 1],
            buf[OFF_SEQ + 2],
            buf[OFF_SEQ + 3],
        ]);
        let payload = match kind {
            PacketType::Data => buf[HEADER_LEN..].to_vec(),
            PacketType::Ack => Vec::new(),
        };

        Ok(Packet { kind, seq, payload })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} seq={} len={}", self.kind, self.seq, self.payload.len())
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedPacket {
    /// Buffer shorter than the fixed header.
    #[error("datagram of {0} bytes is shorter than the {HEADER_LEN}-byte header")]
    TooShort(usize),
    /// First byte is neither `'D'` nor `'A'`.
    #[error("unrecognised packet type tag {0:#04x}")]
    UnknownType(u8),
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_packet_layout() {
        let bytes = Packet::data(7, b"hello".to_vec()).encode();
        assert_eq!(bytes[0], 0x44);
        assert_eq!(&bytes[1..5], &[0, 0, 0, 7]);
        assert_eq!(&bytes[5..], b"hello");
        assert_eq!(bytes.len(), HEADER_LEN + 5);
    }

    #[test]
    fn ack_packet_is_header_only() {
        let bytes = Packet::ack(3).encode();
        assert_eq!(bytes, vec![0x41, 0, 0, 0, 3]);
    }

    #[test]
    fn seq_big_endian_on_wire() {
        let bytes = Packet::ack(0x0102_0304).encode();
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn decode_data_splits_at_header() {
        let raw = [b'D', 0, 0, 1, 0, 0xaa, 0xbb];
        let pkt = Packet::decode(&raw).unwrap();
        assert_eq!(pkt.kind, PacketType::Data);
        assert_eq!(pkt.seq, 256);
        assert_eq!(pkt.payload, vec![0xaa, 0xbb]);
    }

    #[test]
    fn decode_ack_ignores_trailing_bytes() {
        let raw = [b'A', 0, 0, 0, 9, 1, 2, 3];
        let pkt = Packet::decode(&raw).unwrap();
        assert_eq!(pkt, Packet::ack(9));
    }

    #[test]
    fn decode_header_only_data_has_empty_payload() {
        let pkt = Packet::decode(&[b'D', 0, 0, 0, 0]).unwrap();
        assert!(pkt.payload.is_empty());
    }

    #[test]
    fn decode_empty_buffer_returns_error() {
        assert_eq!(Packet::decode(&[]), Err(MalformedPacket::TooShort(0)));
    }

    #[test]
    fn decode_short_header_returns_error() {
        assert_eq!(
            Packet::decode(&[b'D', 0, 0, 0]),
            Err(MalformedPacket::TooShort(HEADER_LEN - 1))
        );
    }

    #[test]
    fn decode_unknown_tag_returns_error() {
        assert_eq!(
            Packet::decode(&[b'X', 0, 0, 0, 1]),
            Err(MalformedPacket::UnknownType(b'X'))
        );
    }

    #[test]
    fn max_payload_fits_max_packet() {
        let bytes = Packet::data(0, vec![0u8; MAX_PAYLOAD]).encode();
        assert_eq!(bytes.len(), MAX_PACKET);
        assert_eq!(MAX_PACKET, 1405);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn oversize_payload_panics() {
        let _ = Packet::data(0, vec![0u8; MAX_PAYLOAD + 1]);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Packet::data(4, vec![1, 2]).to_string(), "DATA seq=4 len=2");
        assert_eq!(Packet::ack(4).to_string(), "ACK seq=4 len=0");
    }
}
