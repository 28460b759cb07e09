//! The pairing exchange - three commands raced against one deadline

use std::time::Duration;

use tokio::sync::mpsc;

use airmx_proto::assemble::{AssembleError, CompleteMessage, Reassembler};
use airmx_proto::frame::IncomingPacket;
use airmx_proto::{
    CMD_CONFIGURE_WIFI, CMD_HANDSHAKE, CMD_REQUEST_IDENTITY, Command, parse_identity_payload,
};

use crate::credentials::WifiCredentials;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::transport::{Transport, TransportError};

/// Time budget for the whole three-command exchange.
pub const PAIRING_DEADLINE: Duration = Duration::from_secs(30);

/// Where the exchange currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingHandshake,
    AwaitingWifiAck,
    AwaitingIdentity,
    Succeeded,
    Failed,
}

/// Outcome of a finished exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSuccess {
    /// The purifier's 4-byte device id, when it reported one. Pairing
    /// without an id is still a success; only the key lookup needs it.
    pub device_id: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum PairError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error("notification stream closed before the exchange finished")]
    NotificationsClosed,
    #[error("pairing did not finish within {}s", PAIRING_DEADLINE.as_secs())]
    DeadlineExpired,
}

/// What the state machine wants done after consuming a message.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// The message did not belong to the current phase; nothing changes.
    Ignored,
    /// Send the next command of the exchange.
    Dispatch(Command),
    /// The exchange finished.
    Complete(PairSuccess),
}

/// Synchronous core of the pairing state machine.
///
/// Owns the phase and decides, one complete message at a time, whether to
/// advance. Driving the transport, the pacing, and the deadline is
/// [`Pairer`]'s job, which keeps every transition an explicit step instead
/// of a side effect buried in a notification callback.
#[derive(Debug)]
pub struct PairingSession {
    phase: Phase,
    credentials: WifiCredentials,
}

impl PairingSession {
    pub fn new(credentials: WifiCredentials) -> Self {
        Self {
            phase: Phase::Idle,
            credentials,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Opens the exchange and returns the command that starts it.
    pub fn begin(&mut self) -> Command {
        self.phase = Phase::AwaitingHandshake;
        Command::Handshake
    }

    /// Consumes one complete message. Advances only when the command id
    /// matches the response the current phase is waiting for; the purifier
    /// pushes unrelated notifications now and then, and those are ignored.
    pub fn on_message(&mut self, message: &CompleteMessage) -> Step {
        match (self.phase, message.command_id) {
            (Phase::AwaitingHandshake, CMD_HANDSHAKE) => {
                self.phase = Phase::AwaitingWifiAck;
                Step::Dispatch(self.credentials.configure_command())
            }
            (Phase::AwaitingWifiAck, CMD_CONFIGURE_WIFI) => {
                self.phase = Phase::AwaitingIdentity;
                Step::Dispatch(Command::RequestIdentity)
            }
            (Phase::AwaitingIdentity, CMD_REQUEST_IDENTITY) => {
                self.phase = Phase::Succeeded;
                Step::Complete(PairSuccess {
                    device_id: parse_identity_payload(&message.payload),
                })
            }
            (phase, other) => {
                log::info!("ignoring response 0x{other:02x} in phase {phase:?}");
                Step::Ignored
            }
        }
    }

    /// Marks the exchange failed, unless it already succeeded.
    pub fn fail(&mut self) {
        if self.phase != Phase::Succeeded {
            self.phase = Phase::Failed;
        }
    }
}

/// Drives one pairing attempt end to end.
///
/// Owns a fresh dispatcher and reassembler, so consuming `self` in
/// [`pair`](Pairer::pair) is what guarantees a retry never reuses a stale
/// sequence counter or a half-filled reassembly buffer: retrying means
/// constructing a new `Pairer`.
pub struct Pairer<T: Transport> {
    transport: T,
    dispatcher: Dispatcher,
    assembler: Reassembler,
    session: PairingSession,
}

impl<T: Transport> Pairer<T> {
    pub fn new(transport: T, credentials: WifiCredentials) -> Self {
        Self {
            transport,
            dispatcher: Dispatcher::new(),
            assembler: Reassembler::new(),
            session: PairingSession::new(credentials),
        }
    }

    /// Runs the attempt: connect, subscribe, then the command exchange under
    /// the 30-second deadline.
    ///
    /// The deadline and a late success cannot both win: the exchange future
    /// runs inside `tokio::time::timeout`, which resolves to exactly one
    /// branch. Whatever the outcome, a connected transport is disconnected
    /// exactly once. A failed connect returns without disconnecting.
    pub async fn pair(mut self) -> Result<PairSuccess, PairError> {
        if let Err(error) = self.transport.connect().await {
            self.session.fail();
            return Err(error.into());
        }

        let mut notifications = match self.transport.subscribe().await {
            Ok(receiver) => receiver,
            Err(error) => {
                self.session.fail();
                self.transport.disconnect().await;
                return Err(error.into());
            }
        };

        let exchanged =
            tokio::time::timeout(PAIRING_DEADLINE, self.exchange(&mut notifications)).await;

        self.transport.disconnect().await;

        match exchanged {
            Ok(Ok(success)) => Ok(success),
            Ok(Err(error)) => {
                self.session.fail();
                Err(error)
            }
            Err(_elapsed) => {
                self.session.fail();
                Err(PairError::DeadlineExpired)
            }
        }
    }

    async fn exchange(
        &mut self,
        notifications: &mut mpsc::Receiver<Vec<u8>>,
    ) -> Result<PairSuccess, PairError> {
        let opening = self.session.begin();
        self.dispatcher
            .dispatch(&mut self.transport, &opening)
            .await?;

        loop {
            let raw = notifications
                .recv()
                .await
                .ok_or(PairError::NotificationsClosed)?;

            let packet = match IncomingPacket::decode(&raw) {
                Ok(packet) => packet,
                Err(error) => {
                    // a stray short notification must not kill the session
                    log::warn!("dropping notification: {error}");
                    continue;
                }
            };

            let Some(message) = self.assembler.push(packet)? else {
                continue;
            };

            match self.session.on_message(&message) {
                Step::Ignored => continue,
                Step::Dispatch(next) => {
                    self.dispatcher
                        .dispatch(&mut self.transport, &next)
                        .await?;
                }
                Step::Complete(success) => return Ok(success),
            }
        }
    }
}
