//! The seam between the pairing core and a concrete BLE stack

use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("write rejected: {0}")]
    Write(String),
}

/// Link to one purifier.
///
/// Implementations locate the device, accept framed packet writes, and
/// deliver raw notification bytes in arrival order through the channel
/// handed out by [`subscribe`](Transport::subscribe). Tearing notification
/// delivery down is part of `disconnect`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Finds the device and opens the link.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Writes one framed packet, suspending until the write is acknowledged.
    async fn write_chunk(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Starts notification delivery. Each notification arrives as one
    /// message on the receiver, in the order the device sent them.
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError>;

    /// Closes the link. Idempotent; safe to call when not connected.
    async fn disconnect(&mut self);
}
