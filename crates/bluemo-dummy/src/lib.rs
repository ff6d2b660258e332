//! bluemo-dummy - In-memory Bluemo device emulator for testing
//!
//! This crate provides a dummy device whose SPI flash lives in memory. It
//! implements [`DeviceSession`] so the paging operations can be exercised
//! without hardware, and it can inject the failures a real link produces.

use bluemo_core::error::{Error, Result};
use bluemo_core::flash::{DataSinkInfo, DeviceSession, FlashInfo, BLANK_BYTE};

/// Configuration for the dummy device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// First address the data sink writes to
    pub start_address: u32,
    /// Flash size in KiB
    pub flash_size_kib: u32,
    /// Erase block size in bytes
    pub block_size: u32,
    /// Page size in bytes
    pub page_size: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            start_address: 0,
            flash_size_kib: 64,
            block_size: 4096,
            page_size: 256,
        }
    }
}

impl DummyConfig {
    /// Flash size in bytes
    pub fn size(&self) -> usize {
        self.flash_size_kib as usize * 1024
    }
}

/// Dummy device
///
/// Flash contents are indexed by absolute address. The data sink appends at
/// `write_address`, starting from `start_address`.
#[derive(Debug)]
pub struct DummyDevice {
    config: DummyConfig,
    data: Vec<u8>,
    write_address: u32,
    fail_read_at: Option<u32>,
    fail_erase: bool,
    stuck_erase: bool,
    erases: Vec<(u32, u32)>,
    reads: usize,
    resets: usize,
}

impl DummyDevice {
    /// Create a device with blank flash
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![BLANK_BYTE; config.size()];
        let write_address = config.start_address;
        Self {
            config,
            data,
            write_address,
            fail_read_at: None,
            fail_erase: false,
            stuck_erase: false,
            erases: Vec::new(),
            reads: 0,
            resets: 0,
        }
    }

    /// Create a device whose data sink already logged `logged` bytes
    pub fn with_data(config: DummyConfig, logged: &[u8]) -> Self {
        let mut device = Self::new(config);
        device.append(logged);
        device
    }

    /// Append bytes through the data sink
    ///
    /// Like NOR flash, programming only clears bits. Bytes past the end of
    /// flash are dropped.
    pub fn append(&mut self, bytes: &[u8]) {
        let start = self.write_address as usize;
        let room = self.data.len().saturating_sub(start);
        let n = bytes.len().min(room);
        if n < bytes.len() {
            log::warn!("dummy: flash full, dropping {} bytes", bytes.len() - n);
        }

        for (dst, src) in self.data[start..start + n].iter_mut().zip(bytes) {
            *dst &= *src;
        }
        self.write_address += n as u32;
    }

    /// Fail every read that starts at `addr`
    pub fn fail_read_at(&mut self, addr: u32) {
        self.fail_read_at = Some(addr);
    }

    /// Reject erase commands
    pub fn fail_erase(&mut self) {
        self.fail_erase = true;
    }

    /// Acknowledge erase commands without erasing
    pub fn stuck_erase(&mut self) {
        self.stuck_erase = true;
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Erase commands received, as `(address, length)`
    pub fn erases(&self) -> &[(u32, u32)] {
        &self.erases
    }

    /// Number of flash reads served
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of soft resets received
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    fn range(&self, addr: u32, len: u32) -> Result<std::ops::Range<usize>> {
        let start = addr as usize;
        let end = start + len as usize;
        if end > self.data.len() {
            return Err(Error::Transport(format!(
                "dummy: 0x{:08X}+{} is outside flash",
                addr, len
            )));
        }
        Ok(start..end)
    }
}

impl DeviceSession for DummyDevice {
    fn data_sink_config(&mut self) -> Result<DataSinkInfo> {
        Ok(DataSinkInfo {
            start_address: self.config.start_address,
            write_address: self.write_address,
        })
    }

    fn flash_init(&mut self) -> Result<FlashInfo> {
        Ok(FlashInfo {
            block_size: self.config.block_size,
            flash_size_kib: self.config.flash_size_kib,
            page_size: self.config.page_size,
        })
    }

    fn flash_read(&mut self, addr: u32, len: u32) -> Result<Vec<u8>> {
        if self.fail_read_at == Some(addr) {
            return Err(Error::Transport("dummy: injected read failure".into()));
        }
        let range = self.range(addr, len)?;
        self.reads += 1;
        Ok(self.data[range].to_vec())
    }

    fn flash_erase(&mut self, addr: u32, len: u32) -> Result<()> {
        if self.fail_erase {
            return Err(Error::Transport("dummy: injected erase failure".into()));
        }
        let range = self.range(addr, len)?;
        self.erases.push((addr, len));
        if !self.stuck_erase {
            self.data[range].fill(BLANK_BYTE);
        }
        Ok(())
    }

    fn soft_reset(&mut self) -> Result<()> {
        self.resets += 1;
        // The data sink resumes after the last written byte
        let start = self.config.start_address as usize;
        let used = self.data[start..]
            .iter()
            .rposition(|&b| b != BLANK_BYTE)
            .map_or(0, |pos| pos + 1);
        self.write_address = self.config.start_address + used as u32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluemo_core::flash;

    fn config() -> DummyConfig {
        DummyConfig {
            start_address: 0x1000,
            flash_size_kib: 5,
            block_size: 0x100,
            page_size: 0x100,
        }
    }

    #[test]
    fn test_describe() {
        let mut device = DummyDevice::new(config());
        let region = flash::describe(&mut device).unwrap();
        assert_eq!(region.start(), 0x1000);
        assert_eq!(region.end(), 0x1400);
        assert_eq!(region.page_count(), 4);
    }

    #[test]
    fn test_append_programs_bits() {
        let mut device = DummyDevice::with_data(config(), &[0x0F, 0xF0]);
        assert_eq!(&device.data()[0x1000..0x1003], &[0x0F, 0xF0, 0xFF]);
        assert_eq!(device.data_sink_config().unwrap().write_address, 0x1002);

        device.append(&[0x00]);
        assert_eq!(device.data_sink_config().unwrap().write_address, 0x1003);
    }

    #[test]
    fn test_scan_stops_at_first_blank_page() {
        let mut device = DummyDevice::with_data(config(), &[0xAB; 0x180]);
        let region = flash::describe(&mut device).unwrap();

        let mut image = Vec::new();
        let total = flash::scan(&mut device, &region, |page| {
            image.extend_from_slice(&page.bytes);
            Ok(())
        })
        .unwrap();

        assert_eq!(total, 0x200);
        assert_eq!(image.len(), 0x200);
        assert!(image[..0x180].iter().all(|&b| b == 0xAB));
        assert!(image[0x180..].iter().all(|&b| b == 0xFF));
        // Two data pages plus the blank one that ended the scan
        assert_eq!(device.reads(), 3);
    }

    #[test]
    fn test_erase_all_clears_written_blocks() {
        let mut device = DummyDevice::with_data(config(), &[0x00; 0x180]);
        let region = flash::describe(&mut device).unwrap();

        let erased = flash::erase_all(&mut device, &region, 16).unwrap();
        assert_eq!(erased, 2);
        assert_eq!(device.erases(), &[(0x1000, 0x100), (0x1100, 0x100)]);
        assert!(device.data()[0x1000..0x1400].iter().all(|&b| b == 0xFF));
        assert_eq!(device.resets(), 1);
        assert_eq!(device.data_sink_config().unwrap().write_address, 0x1000);
    }

    #[test]
    fn test_erase_failure_skips_reset() {
        let mut device = DummyDevice::with_data(config(), &[0x00; 0x10]);
        device.fail_erase();
        let region = flash::describe(&mut device).unwrap();

        assert!(matches!(
            flash::erase_all(&mut device, &region, 16),
            Err(Error::Erase { addr: 0x1000, .. })
        ));
        assert_eq!(device.resets(), 0);
    }

    #[test]
    fn test_stuck_erase_fails_verify() {
        let mut device = DummyDevice::with_data(config(), &[0x00; 0x10]);
        device.stuck_erase();
        let region = flash::describe(&mut device).unwrap();

        assert!(matches!(
            flash::erase_all(&mut device, &region, 16),
            Err(Error::EraseVerify { addr: 0x1000 })
        ));
        assert_eq!(device.erases().len(), 1);
        assert_eq!(device.resets(), 0);
    }

    #[test]
    fn test_injected_read_failure() {
        let mut device = DummyDevice::with_data(config(), &[0x00; 0x200]);
        device.fail_read_at(0x1100);
        let region = flash::describe(&mut device).unwrap();

        let mut pages = 0;
        let err = flash::scan(&mut device, &region, |_| {
            pages += 1;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::PageRead { addr: 0x1100, .. }));
        assert_eq!(pages, 1);
    }
}
