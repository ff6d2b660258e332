//! Device command boundary
//!
//! This module provides the `DeviceSession` trait, the narrow set of device
//! commands the paging operations need. Every method sends one command and
//! blocks for exactly one matching response; timeouts belong to the
//! implementation.

use crate::error::Result;

/// Data sink configuration reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSinkInfo {
    /// First flash address the data sink writes to
    pub start_address: u32,
    /// Next address the data sink will write (write progress)
    pub write_address: u32,
}

/// SPI flash geometry reported by the flash-init query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashInfo {
    /// Smallest erase unit in bytes
    pub block_size: u32,
    /// Total flash size in KiB
    pub flash_size_kib: u32,
    /// Smallest read/program unit in bytes
    pub page_size: u32,
}

impl FlashInfo {
    /// Total flash size in bytes
    pub fn flash_size(&self) -> u64 {
        self.flash_size_kib as u64 * 1024
    }
}

/// A live connection to a device that owns the flash
///
/// # Example
///
/// ```ignore
/// use bluemo_core::flash::DeviceSession;
///
/// fn first_bytes<S: DeviceSession>(session: &mut S) -> bluemo_core::Result<Vec<u8>> {
///     let sink = session.data_sink_config()?;
///     session.flash_read(sink.start_address, 16)
/// }
/// ```
pub trait DeviceSession {
    /// Query the data sink configuration
    fn data_sink_config(&mut self) -> Result<DataSinkInfo>;

    /// Initialize the SPI flash driver and return its geometry
    fn flash_init(&mut self) -> Result<FlashInfo>;

    /// Read `len` bytes starting at `addr`
    fn flash_read(&mut self, addr: u32, len: u32) -> Result<Vec<u8>>;

    /// Erase `len` bytes starting at `addr`
    ///
    /// `addr` and `len` are expected to be block aligned.
    fn flash_erase(&mut self, addr: u32, len: u32) -> Result<()>;

    /// Reset the device
    fn soft_reset(&mut self) -> Result<()>;
}

impl<S: DeviceSession + ?Sized> DeviceSession for &mut S {
    fn data_sink_config(&mut self) -> Result<DataSinkInfo> {
        (**self).data_sink_config()
    }

    fn flash_init(&mut self) -> Result<FlashInfo> {
        (**self).flash_init()
    }

    fn flash_read(&mut self, addr: u32, len: u32) -> Result<Vec<u8>> {
        (**self).flash_read(addr, len)
    }

    fn flash_erase(&mut self, addr: u32, len: u32) -> Result<()> {
        (**self).flash_erase(addr, len)
    }

    fn soft_reset(&mut self) -> Result<()> {
        (**self).soft_reset()
    }
}
