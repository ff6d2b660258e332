//! Page scanner

use super::region::{FlashRegion, Page};
use super::session::DeviceSession;
use crate::error::{Error, Result};

/// Read the written prefix of a region page by page
///
/// Pages are read in ascending address order and handed to `on_page`. The
/// first blank page ends the scan; later pages are never read, even if they
/// hold stale data.
///
/// Returns the total number of bytes passed to `on_page`.
///
/// # Errors
/// * `PageRead` - if the device fails a read or returns a short page
/// * any error returned by `on_page`, unchanged
pub fn scan<S, F>(session: &mut S, region: &FlashRegion, mut on_page: F) -> Result<u64>
where
    S: DeviceSession + ?Sized,
    F: FnMut(&Page) -> Result<()>,
{
    let page_size = region.page_size();
    let mut total = 0u64;

    for address in region.page_addresses() {
        let bytes = session
            .flash_read(address, page_size)
            .map_err(|e| Error::page_read(address, e))?;

        if bytes.len() != page_size as usize {
            return Err(Error::page_read(
                address,
                Error::Transport(format!(
                    "short read: {} of {} bytes",
                    bytes.len(),
                    page_size
                )),
            ));
        }

        let page = Page { address, bytes };
        if page.is_blank() {
            log::debug!("Blank page at 0x{:08X}, end of data", address);
            break;
        }

        log::debug!("Address: 0x{:08X}", address);
        on_page(&page)?;
        total += page.bytes.len() as u64;
    }

    Ok(total)
}
