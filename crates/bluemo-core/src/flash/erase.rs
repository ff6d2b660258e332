//! Erase-verify loop

use super::region::{is_blank, FlashRegion};
use super::session::DeviceSession;
use crate::error::{Error, Result};

/// Default number of bytes read at each probe address
pub const DEFAULT_PROBE_SIZE: u32 = 16;

/// Erase the written prefix of a region
///
/// Walks page-aligned probe addresses in ascending order and reads
/// `probe_size` bytes (at most one page) at each. A blank probe marks the
/// end of written data and stops the walk. A non-blank probe erases its
/// containing block, re-reads the probe to verify the erase took, and
/// continues at the next block boundary.
///
/// When the walk ends the device is reset.
///
/// Returns the number of blocks erased.
///
/// # Errors
/// * `InvalidParameter` - if `probe_size` is zero
/// * `PageRead` - if a probe read fails
/// * `Erase` - if the device fails an erase command
/// * `EraseVerify` - if a probe is still not blank after its block was erased
///
/// Blocks erased before a failure stay erased, and no reset is sent.
pub fn erase_all<S: DeviceSession + ?Sized>(
    session: &mut S,
    region: &FlashRegion,
    probe_size: u32,
) -> Result<u32> {
    if probe_size == 0 {
        return Err(Error::InvalidParameter("probe size must be non-zero".into()));
    }
    let probe_len = probe_size.min(region.page_size());

    let mut erased = 0u32;
    let mut addr = region.start();

    while addr < region.end() {
        let probe = session
            .flash_read(addr, probe_len)
            .map_err(|e| Error::page_read(addr, e))?;

        if is_blank(&probe) {
            log::debug!("Blank probe at 0x{:08X}, end of data", addr);
            break;
        }

        let block = region.block_base(addr);
        log::debug!("Erasing block 0x{:08X} (data at 0x{:08X})", block, addr);
        session
            .flash_erase(block, region.block_size())
            .map_err(|e| Error::erase(block, e))?;

        let verify = session
            .flash_read(addr, probe_len)
            .map_err(|e| Error::page_read(addr, e))?;
        if !is_blank(&verify) {
            return Err(Error::EraseVerify { addr });
        }

        erased += 1;
        // The last block may end at the top of the address space
        match block.checked_add(region.block_size()) {
            Some(next) => addr = next,
            None => break,
        }
    }

    session.soft_reset()?;
    log::info!("Erased {} block(s)", erased);

    Ok(erased)
}
