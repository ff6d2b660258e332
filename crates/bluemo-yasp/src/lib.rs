//! bluemo-yasp - YASP framed message protocol
//!
//! This crate implements the message protocol Bluemo devices speak, both on
//! a live link and inside the flash images the data sink writes.
//!
//! # Protocol Overview
//!
//! Every message is a frame of a 16-bit little-endian payload length, a
//! one-byte code and the payload. The host sends commands; the device answers
//! each with a response whose code is the command code with bit 7 set. Stream
//! data and RTC syncs use the same response codes whether they travel over
//! the link or get appended to flash.
//!
//! # Supported Transports
//!
//! - Serial port: `dev=/dev/ttyACM0`, `dev=COM16:115200`
//! - TCP socket: `ip=host:port`
//!
//! # Example
//!
//! ```no_run
//! use bluemo_core::flash::DeviceSession;
//! use bluemo_yasp::{SerialTransport, YaspClient};
//!
//! let transport = SerialTransport::open("/dev/ttyACM0", Some(115200))?;
//! let mut client = YaspClient::new(transport);
//!
//! println!("Device time: {:.6} s", client.rtc_sync()?.seconds());
//! let sink = client.data_sink_config()?;
//! println!("Written up to 0x{:08X}", sink.write_address);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(rust_2018_idioms)]

pub mod client;
pub mod decoder;
pub mod error;
pub mod message;
pub mod protocol;
pub mod telemetry;
pub mod transport;

// Re-exports
pub use client::YaspClient;
pub use decoder::StreamDecoder;
pub use error::{Result, YaspError};
pub use message::{AdsStreamParams, Command, Message};
pub use protocol::{AdsDataRate, AdsInputMux, AdsPga, DataSink, Frame, FrameBuffer, Modify, MsgCode};
pub use telemetry::{DecodeSummary, TelemetryDecoder, DEFAULT_CHUNK_SIZE};
pub use transport::serial::SerialTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;

/// Connection options for a YASP link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YaspConnection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyACM0" or "COM16")
        device: String,
        /// Baud rate (None for the default)
        baud: Option<u32>,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl YaspConnection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyACM0` - Serial with default baud
    /// - `dev=/dev/ttyACM0:115200` - Serial with specified baud
    /// - `ip=host:port` - TCP connection
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(dev) = s.strip_prefix("dev=") {
            if let Some((device, baud_str)) = dev.rsplit_once(':') {
                let baud = baud_str
                    .parse()
                    .map_err(|_| format!("Invalid baud rate: {}", baud_str))?;
                Ok(YaspConnection::Serial {
                    device: device.to_string(),
                    baud: Some(baud),
                })
            } else {
                Ok(YaspConnection::Serial {
                    device: dev.to_string(),
                    baud: None,
                })
            }
        } else if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port_str) = ip
                .rsplit_once(':')
                .ok_or_else(|| "Missing port in ip= parameter".to_string())?;
            let port = port_str
                .parse()
                .map_err(|_| format!("Invalid port: {}", port_str))?;
            Ok(YaspConnection::Tcp {
                host: host.to_string(),
                port,
            })
        } else {
            Err(format!(
                "Invalid connection string: {}. Use dev=... or ip=...",
                s
            ))
        }
    }
}

/// Open a YASP link and return a client over a type-erased transport
pub fn open_client(
    options: &str,
) -> std::result::Result<YaspClient<Box<dyn Transport>>, Box<dyn std::error::Error>> {
    let conn = YaspConnection::parse(options)?;

    let transport: Box<dyn Transport> = match conn {
        YaspConnection::Serial { device, baud } => {
            Box::new(SerialTransport::open(&device, baud)?)
        }
        YaspConnection::Tcp { host, port } => Box::new(TcpTransport::connect(&host, port)?),
    };

    Ok(YaspClient::new(transport))
}
