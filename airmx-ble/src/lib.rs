//! AIRMX BLE transport
//!
//! btleplug-backed device discovery and the [`airmx_pair::Transport`]
//! implementation the pairing driver runs on.
//!
//! # Example
//!
//! ```ignore
//! use airmx_ble::ble::{self, BleTransport};
//! use airmx_pair::{Pairer, WifiCredentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Scan for purifiers
//!     for device in ble::scan(5).await? {
//!         println!("{} ({})", device.name, device.address);
//!     }
//!
//!     // Pair one
//!     let credentials = WifiCredentials::new("MySSID", "MyPassword")?;
//!     let transport = BleTransport::with_default_adapter(None).await?;
//!     let success = Pairer::new(transport, credentials).pair().await?;
//!     println!("paired, device id: {:?}", success.device_id);
//!
//!     Ok(())
//! }
//! ```

pub mod ble;

pub use ble::BleTransport;
