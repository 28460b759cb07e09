//! GATT constants for the AIRMX Pro pairing service
//!
//! The purifier exposes one primary service with a write characteristic for
//! framed commands and a notify characteristic for framed responses.

/// Advertised device name.
pub const DEVICE_NAME: &str = "AIRMX Pro";

/// Primary pairing service UUID.
pub const SERVICE_UUID: &str = "22210000-554a-4546-5542-46534450464d";

/// Command characteristic UUID (write)
pub const WRITE_CHARACTERISTIC_UUID: &str = "22210001-554a-4546-5542-46534450464d";

/// Response characteristic UUID (notify)
pub const NOTIFY_CHARACTERISTIC_UUID: &str = "22210002-554a-4546-5542-46534450464d";
