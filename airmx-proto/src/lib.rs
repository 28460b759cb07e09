//! AIRMX wire protocol - command catalog, packet framing, and reassembly
//!
//! Every exchange with the purifier is a command written to the write
//! characteristic as one or more framed packets, answered by notifications
//! framed the same way. [`frame`] covers the packet layer, [`assemble`]
//! rebuilds multi-packet notifications, and [`Command`] is the catalog of
//! everything the host can send.

pub mod assemble;
pub mod ble;
pub mod frame;

pub use assemble::{AssembleError, CompleteMessage, Reassembler};
pub use frame::{FrameError, IncomingPacket, PacketHeader};

// Command identifiers
pub const CMD_HANDSHAKE: u8 = 0x0b;
pub const CMD_CONFIGURE_WIFI: u8 = 0x15;
pub const CMD_REQUEST_IDENTITY: u8 = 0x16;

/// Protocol version sent in the handshake payload.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// An outbound command and its payload encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Opens the exchange: a zero token and the protocol version.
    Handshake,
    /// Hands the purifier the Wi-Fi network it should join.
    ConfigureWifi { ssid: String, password: String },
    /// Asks the purifier for its identity record.
    RequestIdentity,
}

impl Command {
    pub fn command_id(&self) -> u8 {
        match self {
            Command::Handshake => CMD_HANDSHAKE,
            Command::ConfigureWifi { .. } => CMD_CONFIGURE_WIFI,
            Command::RequestIdentity => CMD_REQUEST_IDENTITY,
        }
    }

    /// Encodes the command payload, before framing.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::Handshake => {
                let version = PROTOCOL_VERSION.as_bytes();
                let mut buf = Vec::with_capacity(10 + version.len());
                buf.push(8); // token storage size
                buf.extend_from_slice(&[0u8; 8]); // token: 0
                buf.push(version.len() as u8);
                buf.extend_from_slice(version);
                buf
            }
            Command::ConfigureWifi { ssid, password } => {
                let ssid = ssid.as_bytes();
                let password = password.as_bytes();
                let mut buf = Vec::with_capacity(2 + ssid.len() + password.len());
                buf.push(ssid.len() as u8);
                buf.extend_from_slice(ssid);
                buf.push(password.len() as u8);
                buf.extend_from_slice(password);
                buf
            }
            Command::RequestIdentity => Vec::new(),
        }
    }
}

/// Extracts the device id from a request-identity response payload.
///
/// Byte 0 declares the id length. The purifier uses 4-byte big-endian ids;
/// any other declared length means the response carries no usable id, which
/// is not an error.
pub fn parse_identity_payload(payload: &[u8]) -> Option<u32> {
    if payload.first() != Some(&4) || payload.len() < 5 {
        return None;
    }
    Some(u32::from_be_bytes([
        payload[1], payload[2], payload[3], payload[4],
    ]))
}
