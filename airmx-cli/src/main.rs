//! BLE pairing tool for AIRMX purifiers
//!
//! Scans for purifiers, walks the pairing exchange with Wi-Fi credentials,
//! and fetches the device key once paired.

mod keyx;

use clap::{Parser, Subcommand};

use airmx_ble::{BleTransport, ble};
use airmx_pair::{Pairer, WifiCredentials};

#[derive(Parser)]
#[command(name = "airmx")]
#[command(about = "BLE pairing tool for AIRMX purifiers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for AIRMX purifiers
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Send Wi-Fi credentials to a purifier and fetch its key
    Pair {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
        /// Wi-Fi network name
        #[arg(long)]
        ssid: String,
        /// Wi-Fi password (8-63 bytes)
        #[arg(long)]
        password: String,
        /// Additional attempts after a failed one
        #[arg(long, default_value = "2")]
        retries: u32,
        /// Key exchange endpoint
        #[arg(long, default_value = keyx::DEFAULT_EXCHANGE_URL)]
        exchange_url: String,
    },
    /// Look up the key for an already paired device
    Key {
        /// Device id reported during pairing
        #[arg(long)]
        device_id: u32,
        /// Key exchange endpoint
        #[arg(long, default_value = keyx::DEFAULT_EXCHANGE_URL)]
        exchange_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { duration } => {
            scan_devices(duration).await?;
        }
        Commands::Pair {
            device,
            ssid,
            password,
            retries,
            exchange_url,
        } => {
            pair_device(device, &ssid, &password, retries, &exchange_url).await?;
        }
        Commands::Key {
            device_id,
            exchange_url,
        } => {
            let key = keyx::lookup_key(&exchange_url, device_id).await?;
            println!("{key}");
        }
    }

    Ok(())
}

async fn scan_devices(duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for AIRMX purifiers ({} seconds)...", duration);

    let devices = ble::scan(duration).await?;

    println!("\nFound {} devices:", devices.len());
    for device in devices {
        let rssi = device
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());
        let marker = if device.is_airmx { " [AIRMX]" } else { "" };

        println!("  {} ({}) RSSI: {}{}", device.name, device.address, rssi, marker);
    }

    Ok(())
}

async fn pair_device(
    target: Option<String>,
    ssid: &str,
    password: &str,
    retries: u32,
    exchange_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // reject bad credentials before any radio traffic
    let credentials = WifiCredentials::new(ssid, password)?;

    let mut attempt = 0;
    let success = loop {
        attempt += 1;
        println!("Pairing attempt {}...", attempt);

        // every attempt gets a fresh transport and driver
        let transport = BleTransport::with_default_adapter(target.clone()).await?;
        match Pairer::new(transport, credentials.clone()).pair().await {
            Ok(success) => break success,
            Err(error) if attempt <= retries => {
                eprintln!("Pairing failed: {}. Retrying...", error);
            }
            Err(error) => return Err(error.into()),
        }
    };

    println!("Paired! The purifier will join '{}'.", credentials.ssid());

    match success.device_id {
        Some(device_id) => {
            println!("Device id: {}", device_id);
            match keyx::lookup_key(exchange_url, device_id).await {
                Ok(key) => println!("Device key: {}", key),
                Err(error) => eprintln!("Key lookup failed: {}", error),
            }
        }
        None => println!("Device reported no id; skipping key lookup."),
    }

    Ok(())
}
