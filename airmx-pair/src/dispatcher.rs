//! Outbound dispatch - framing, sequencing, and paced delivery

use std::time::Duration;

use airmx_proto::Command;
use airmx_proto::frame::{self, FrameError, HEADER_LEN, PacketHeader};

use crate::transport::{Transport, TransportError};

/// Gap after every packet write. The link has no flow control; this is how
/// long the purifier needs to drain one packet.
pub const PACKET_SPACING: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Frames commands into sequenced packets and writes them out one at a time.
///
/// The sequence counter spans every command this dispatcher sends, one
/// increment per packet, wrapping modulo 256. A retry builds a fresh
/// dispatcher and therefore restarts at 1.
#[derive(Debug)]
pub struct Dispatcher {
    sequence_number: u8,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { sequence_number: 1 }
    }

    /// Frames `command` into its ordered packet list, consuming one sequence
    /// number per packet.
    pub fn frame(&mut self, command: &Command) -> Result<Vec<Vec<u8>>, FrameError> {
        let payload = command.payload();
        let chunks = frame::chunks(&payload)?;
        let total = chunks.len() as u8;

        Ok(chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let header = PacketHeader {
                    sequence_number: self.next_sequence(),
                    current_packet: index as u8 + 1,
                    total_packet: total,
                    encrypted: false,
                    command_id: command.command_id(),
                };
                let mut packet = Vec::with_capacity(HEADER_LEN + chunk.len());
                packet.extend_from_slice(&header.to_bytes());
                packet.extend_from_slice(chunk);
                packet
            })
            .collect())
    }

    /// Writes every packet of `command`, sleeping [`PACKET_SPACING`] after
    /// each write, the last one included. Write failures propagate without
    /// retry; retrying a whole attempt is the caller's decision.
    pub async fn dispatch<T: Transport>(
        &mut self,
        transport: &mut T,
        command: &Command,
    ) -> Result<(), DispatchError> {
        for packet in self.frame(command)? {
            log::debug!("sending chunk: {}", hex(&packet));
            transport.write_chunk(&packet).await?;
            tokio::time::sleep(PACKET_SPACING).await;
        }
        Ok(())
    }

    fn next_sequence(&mut self) -> u8 {
        let sequence = self.sequence_number;
        self.sequence_number = self.sequence_number.wrapping_add(1);
        sequence
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn single_chunk_command_frames_as_one_packet() {
        let mut dispatcher = Dispatcher::new();
        let packets = dispatcher.frame(&Command::Handshake).unwrap();

        assert_eq!(packets.len(), 1);
        // seq 1, packet 1 of 1, unencrypted, handshake
        assert_eq!(&packets[0][..HEADER_LEN], &[0x01, 0x11, 0x00, 0x0b]);
        assert_eq!(&packets[0][HEADER_LEN..], &Command::Handshake.payload()[..]);
    }

    #[test]
    fn empty_payload_still_produces_one_packet() {
        let mut dispatcher = Dispatcher::new();
        let packets = dispatcher.frame(&Command::RequestIdentity).unwrap();

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0], vec![0x01, 0x11, 0x00, 0x16]);
    }

    #[test]
    fn long_payloads_split_into_numbered_chunks() {
        let mut dispatcher = Dispatcher::new();
        // payload: 1 + 20 + 1 + 8 = 30 bytes -> chunks of 16 and 14
        let command = Command::ConfigureWifi {
            ssid: "a".repeat(20),
            password: "b".repeat(8),
        };
        let packets = dispatcher.frame(&command).unwrap();

        assert_eq!(packets.len(), 2);
        assert_eq!(&packets[0][..HEADER_LEN], &[0x01, 0x12, 0x00, 0x15]);
        assert_eq!(&packets[1][..HEADER_LEN], &[0x02, 0x22, 0x00, 0x15]);
        assert_eq!(packets[0].len(), HEADER_LEN + 16);
        assert_eq!(packets[1].len(), HEADER_LEN + 14);

        let rebuilt: Vec<u8> = packets
            .iter()
            .flat_map(|p| p[HEADER_LEN..].to_vec())
            .collect();
        assert_eq!(rebuilt, command.payload());
    }

    #[test]
    fn sequence_numbers_increase_across_commands() {
        let mut dispatcher = Dispatcher::new();
        let first = dispatcher.frame(&Command::Handshake).unwrap();
        let second = dispatcher.frame(&Command::Handshake).unwrap();

        let sequences: Vec<u8> = first.iter().chain(&second).map(|p| p[0]).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn sequence_counter_wraps_modulo_256() {
        let mut dispatcher = Dispatcher::new();
        let sequences: Vec<u8> = (0..256)
            .map(|_| dispatcher.frame(&Command::RequestIdentity).unwrap()[0][0])
            .collect();

        assert_eq!(sequences[0], 1);
        assert_eq!(sequences[254], 255);
        // 255 wraps to 0, not back to 1
        assert_eq!(sequences[255], 0);
    }

    struct RecordingTransport {
        writes: Vec<Vec<u8>>,
    }

    impl Transport for RecordingTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn write_chunk(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.writes.push(bytes.to_vec());
            Ok(())
        }

        async fn subscribe(&mut self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn disconnect(&mut self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_paces_every_write_including_the_last() {
        let mut dispatcher = Dispatcher::new();
        let mut transport = RecordingTransport { writes: Vec::new() };
        let command = Command::ConfigureWifi {
            ssid: "a".repeat(20),
            password: "b".repeat(8),
        };

        let started = tokio::time::Instant::now();
        dispatcher
            .dispatch(&mut transport, &command)
            .await
            .unwrap();

        assert_eq!(transport.writes.len(), 2);
        assert_eq!(started.elapsed(), PACKET_SPACING * 2);
    }
}
