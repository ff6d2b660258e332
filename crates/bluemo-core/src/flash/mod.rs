//! Flash paging operations
//!
//! The data sink on the device appends framed messages to SPI flash starting
//! at a fixed address. Nothing marks the end of the written data: the first
//! page that reads back fully erased (all `0xFF`) is the end. Both the
//! scanner and the erase loop rely on that append-only assumption and stop at
//! the first blank page.

mod erase;
mod region;
mod scan;
mod session;

pub use erase::{erase_all, DEFAULT_PROBE_SIZE};
pub use region::{describe, is_blank, FlashRegion, Page, BLANK_BYTE};
pub use scan::scan;
pub use session::{DataSinkInfo, DeviceSession, FlashInfo};
