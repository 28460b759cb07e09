//! Reassembly of multi-packet notifications into complete messages

use crate::frame::IncomingPacket;

/// A fully reassembled inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMessage {
    pub command_id: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    /// The final packet arrived before every earlier packet did.
    #[error("message closed with {received} of {expected} packets")]
    Incomplete { expected: u8, received: usize },
    /// A packet is out of position within an otherwise full message.
    #[error("expected packet {expected} at position {index}, found {found}")]
    MissingPacket { index: usize, expected: u8, found: u8 },
}

/// Accumulates packets for the one in-flight inbound message.
///
/// The protocol carries a single message at a time; interleaving packets of
/// unrelated messages is not supported. The buffer is cleared after both a
/// completed message and a detected violation, so the next message always
/// starts clean.
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: Vec<IncomingPacket>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets received so far for the unfinished message.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drops any partially received message.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Feeds one packet, completing the message when the packet marked
    /// `current == total` arrives.
    ///
    /// Completion requires the buffer to hold exactly `total` packets whose
    /// positions run 1..=total in arrival order. Payloads are concatenated
    /// in that order and the message carries the final packet's command id.
    pub fn push(
        &mut self,
        packet: IncomingPacket,
    ) -> Result<Option<CompleteMessage>, AssembleError> {
        let header = packet.header;
        self.pending.push(packet);

        if header.current_packet != header.total_packet {
            return Ok(None);
        }

        // take() clears the buffer on the violation paths too
        let pending = std::mem::take(&mut self.pending);

        if pending.len() != header.total_packet as usize {
            return Err(AssembleError::Incomplete {
                expected: header.total_packet,
                received: pending.len(),
            });
        }

        for (index, received) in pending.iter().enumerate() {
            let expected = index as u8 + 1;
            if received.header.current_packet != expected {
                return Err(AssembleError::MissingPacket {
                    index,
                    expected,
                    found: received.header.current_packet,
                });
            }
        }

        let mut payload = Vec::new();
        for packet in &pending {
            payload.extend_from_slice(&packet.payload);
        }

        Ok(Some(CompleteMessage {
            command_id: header.command_id,
            payload,
        }))
    }
}
