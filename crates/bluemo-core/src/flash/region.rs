//! Flash region descriptor

use super::session::DeviceSession;
use crate::error::{Error, Result};

/// Value of an erased flash byte
pub const BLANK_BYTE: u8 = 0xFF;

/// Check whether a buffer reads back as erased flash
///
/// An empty buffer is not blank: a device that returns no data did not
/// answer the read.
pub fn is_blank(data: &[u8]) -> bool {
    !data.is_empty() && data.iter().all(|&b| b == BLANK_BYTE)
}

/// The part of the flash the data sink writes to
///
/// Resolved once per session from the device and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegion {
    start: u32,
    end: u32,
    block_size: u32,
    page_size: u32,
}

impl FlashRegion {
    /// Create a region, validating its geometry
    ///
    /// # Errors
    /// * `DeviceQuery` - if `end <= start`, a size is zero, the span is not a
    ///   whole number of pages and blocks, or blocks are not whole pages
    pub fn new(start: u32, end: u32, block_size: u32, page_size: u32) -> Result<Self> {
        if end <= start {
            return Err(Error::DeviceQuery(format!(
                "region end 0x{:08X} is not above start 0x{:08X}",
                end, start
            )));
        }
        if page_size == 0 || block_size == 0 {
            return Err(Error::DeviceQuery(format!(
                "zero geometry: page size {}, block size {}",
                page_size, block_size
            )));
        }

        let span = end - start;
        if span % page_size != 0 {
            return Err(Error::DeviceQuery(format!(
                "region span 0x{:X} is not a multiple of the page size 0x{:X}",
                span, page_size
            )));
        }
        if span % block_size != 0 {
            return Err(Error::DeviceQuery(format!(
                "region span 0x{:X} is not a multiple of the block size 0x{:X}",
                span, block_size
            )));
        }
        if block_size % page_size != 0 {
            return Err(Error::DeviceQuery(format!(
                "block size 0x{:X} is not a multiple of the page size 0x{:X}",
                block_size, page_size
            )));
        }

        Ok(Self {
            start,
            end,
            block_size,
            page_size,
        })
    }

    /// First address of the region
    pub fn start(&self) -> u32 {
        self.start
    }

    /// One past the last address of the region
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Erase granularity in bytes
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Read granularity in bytes
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of bytes in the region
    pub fn span(&self) -> u32 {
        self.end - self.start
    }

    /// Number of pages in the region
    pub fn page_count(&self) -> u32 {
        self.span() / self.page_size
    }

    /// Page start addresses in ascending order
    pub fn page_addresses(&self) -> impl Iterator<Item = u32> {
        let start = self.start;
        let page_size = self.page_size;
        (0..self.page_count()).map(move |page| start + page * page_size)
    }

    /// Round an address down to the start of its erase block
    ///
    /// Blocks are aligned to absolute flash addresses, not to the region
    /// start.
    pub fn block_base(&self, addr: u32) -> u32 {
        addr - addr % self.block_size
    }
}

/// One page read from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Flash address of the first byte
    pub address: u32,
    /// Page contents
    pub bytes: Vec<u8>,
}

impl Page {
    /// Check whether the page is erased
    pub fn is_blank(&self) -> bool {
        is_blank(&self.bytes)
    }
}

/// Resolve the data-sink region from the device
///
/// Issues the data-sink configuration query (region start) and the flash
/// initialization query (block size, flash size, page size).
///
/// # Errors
/// * `DeviceQuery` - if either query fails or the geometry is inconsistent
pub fn describe<S: DeviceSession + ?Sized>(session: &mut S) -> Result<FlashRegion> {
    let sink = session
        .data_sink_config()
        .map_err(|e| Error::DeviceQuery(format!("data sink configuration: {}", e)))?;
    let info = session
        .flash_init()
        .map_err(|e| Error::DeviceQuery(format!("flash initialization: {}", e)))?;

    let end = u32::try_from(info.flash_size()).map_err(|_| {
        Error::DeviceQuery(format!(
            "flash size {} KiB exceeds the 32-bit address space",
            info.flash_size_kib
        ))
    })?;

    let region = FlashRegion::new(sink.start_address, end, info.block_size, info.page_size)?;
    log::info!(
        "Flash region 0x{:08X}..0x{:08X} (page {} bytes, block {} bytes)",
        region.start(),
        region.end(),
        region.page_size(),
        region.block_size()
    );

    Ok(region)
}
