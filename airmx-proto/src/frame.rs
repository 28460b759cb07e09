//! Packet framing - the 4-byte header and 16-byte chunking
//!
//! Header layout (bytes):
//! - sequence_number: u8
//! - current_packet << 4 | total_packet (both 1-based, 4-bit)
//! - encrypted flag (always 0x00 outbound)
//! - command_id: u8

/// Payload bytes carried by one packet.
pub const CHUNK_SIZE: usize = 16;

/// Header length in bytes.
pub const HEADER_LEN: usize = 4;

/// The packet-count fields are nibbles, capping a message at 15 packets.
pub const MAX_CHUNKS: usize = 15;

/// Largest payload one command can carry before framing.
pub const MAX_PAYLOAD: usize = CHUNK_SIZE * MAX_CHUNKS;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("packet of {len} bytes is shorter than the 4-byte header")]
    MalformedPacket { len: usize },
    #[error("payload of {len} bytes exceeds the {MAX_PAYLOAD}-byte framing limit")]
    PayloadTooLarge { len: usize },
}

/// The header carried by every packet in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub sequence_number: u8,
    /// 1-based position of this packet within its message.
    pub current_packet: u8,
    pub total_packet: u8,
    pub encrypted: bool,
    pub command_id: u8,
}

impl PacketHeader {
    /// Packs the header. `current_packet` and `total_packet` must fit a
    /// nibble; [`chunks`] guarantees that for anything it produced.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        assert!(
            self.current_packet as usize <= MAX_CHUNKS
                && self.total_packet as usize <= MAX_CHUNKS,
            "packet counts do not fit the 4-bit header fields"
        );
        [
            self.sequence_number,
            self.current_packet << 4 | self.total_packet,
            if self.encrypted { 0x01 } else { 0x00 },
            self.command_id,
        ]
    }

    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self {
            sequence_number: bytes[0],
            current_packet: bytes[1] >> 4,
            total_packet: bytes[1] & 0x0f,
            encrypted: bytes[2] != 0,
            command_id: bytes[3],
        }
    }
}

/// A notification packet as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingPacket {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl IncomingPacket {
    /// Parses raw notification bytes: header first, payload is the rest.
    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < HEADER_LEN {
            return Err(FrameError::MalformedPacket { len: data.len() });
        }

        let header = PacketHeader::from_bytes(data[..HEADER_LEN].try_into().unwrap());
        Ok(Self {
            header,
            payload: data[HEADER_LEN..].to_vec(),
        })
    }
}

/// Splits a command payload into chunk slices of at most [`CHUNK_SIZE`]
/// bytes.
///
/// An empty payload yields exactly one empty chunk, so every command still
/// produces a packet. Payloads needing more than [`MAX_CHUNKS`] chunks do
/// not fit the header's 4-bit count fields and are rejected outright rather
/// than truncated.
pub fn chunks(payload: &[u8]) -> Result<Vec<&[u8]>, FrameError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge { len: payload.len() });
    }
    if payload.is_empty() {
        return Ok(vec![payload]);
    }
    Ok(payload.chunks(CHUNK_SIZE).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packs_counts_into_one_byte() {
        let header = PacketHeader {
            sequence_number: 7,
            current_packet: 2,
            total_packet: 3,
            encrypted: false,
            command_id: 0x15,
        };
        assert_eq!(header.to_bytes(), [0x07, 0x23, 0x00, 0x15]);
    }

    #[test]
    fn header_round_trips() {
        let header = PacketHeader {
            sequence_number: 255,
            current_packet: 15,
            total_packet: 15,
            encrypted: false,
            command_id: 0x0b,
        };
        assert_eq!(PacketHeader::from_bytes(header.to_bytes()), header);
    }

    #[test]
    fn chunk_counts_for_boundary_lengths() {
        for (len, expected) in [(0, 1), (1, 1), (16, 1), (17, 2), (240, 15)] {
            let payload = vec![0xaa; len];
            assert_eq!(chunks(&payload).unwrap().len(), expected, "len {len}");
        }
    }

    #[test]
    fn chunking_round_trips_payloads() {
        let payload: Vec<u8> = (0..=239).map(|i| (i % 251) as u8).collect();
        let rebuilt: Vec<u8> = chunks(&payload)
            .unwrap()
            .into_iter()
            .flatten()
            .copied()
            .collect();
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert_eq!(
            chunks(&payload),
            Err(FrameError::PayloadTooLarge { len: 241 })
        );
    }

    #[test]
    fn decode_rejects_short_packets() {
        assert_eq!(
            IncomingPacket::decode(&[0x01, 0x11]),
            Err(FrameError::MalformedPacket { len: 2 })
        );
    }

    #[test]
    fn decode_splits_header_and_payload() {
        let packet = IncomingPacket::decode(&[0x01, 0x11, 0x00, 0x0b, 0xde, 0xad]).unwrap();
        assert_eq!(packet.header.sequence_number, 1);
        assert_eq!(packet.header.current_packet, 1);
        assert_eq!(packet.header.total_packet, 1);
        assert!(!packet.header.encrypted);
        assert_eq!(packet.header.command_id, 0x0b);
        assert_eq!(packet.payload, vec![0xde, 0xad]);
    }

    #[test]
    fn decode_accepts_header_only_packets() {
        let packet = IncomingPacket::decode(&[0x02, 0x11, 0x00, 0x16]).unwrap();
        assert!(packet.payload.is_empty());
    }
}
