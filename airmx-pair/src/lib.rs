//! AIRMX pairing core
//!
//! Everything between a validated set of Wi-Fi credentials and a paired
//! purifier: the [`Transport`] seam a BLE stack plugs into, the
//! [`Dispatcher`] that frames and paces outbound commands, and the
//! [`Pairer`] driver that walks the three-command exchange against its
//! deadline.

pub mod credentials;
pub mod dispatcher;
pub mod session;
pub mod transport;

pub use credentials::{CredentialsError, WifiCredentials};
pub use dispatcher::{DispatchError, Dispatcher, PACKET_SPACING};
pub use session::{
    PAIRING_DEADLINE, PairError, PairSuccess, Pairer, PairingSession, Phase, Step,
};
pub use transport::{Transport, TransportError};
