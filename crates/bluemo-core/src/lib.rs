//! bluemo-core - Core library for Bluemo telemetry retrieval
//!
//! This crate provides the transport-independent parts of the tool:
//!
//! - **Flash paging**: resolving the data-sink region from the device,
//!   scanning it page by page up to the first blank page, and clearing the
//!   written prefix with a block-aligned erase-verify walk.
//! - **Offline decoding**: turning decoded RTC-sync and sample-batch messages
//!   into a sequence of timestamp-correlated output records.
//!
//! Live operations talk to the device through the [`flash::DeviceSession`]
//! trait, which the YASP client (or the in-memory dummy device) implements.
//!
//! # Example
//!
//! ```ignore
//! use bluemo_core::flash::{self, DeviceSession};
//!
//! fn dump<S: DeviceSession>(session: &mut S) -> bluemo_core::Result<Vec<u8>> {
//!     let region = flash::describe(session)?;
//!     let mut image = Vec::new();
//!     flash::scan(session, &region, |page| {
//!         image.extend_from_slice(&page.bytes);
//!         Ok(())
//!     })?;
//!     Ok(image)
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod decode;
pub mod error;
pub mod flash;

pub use error::{Error, Result};
