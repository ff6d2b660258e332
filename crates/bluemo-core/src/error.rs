//! Error types for bluemo-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A region query did not answer or answered with inconsistent geometry
    #[error("device query failed: {0}")]
    DeviceQuery(String),

    /// Reading a page (or erase probe) from the device failed
    #[error("failed to read flash at 0x{addr:08X}")]
    PageRead {
        /// Address of the failed read
        addr: u32,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The device rejected or failed a block erase
    #[error("failed to erase block at 0x{addr:08X}")]
    Erase {
        /// Block base address
        addr: u32,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A block still reads back non-blank after it was erased
    #[error("erase verify failed: 0x{addr:08X} is not blank after erase")]
    EraseVerify {
        /// Probe address that stayed non-blank
        addr: u32,
    },

    /// A sample batch payload disagrees with its declared count
    #[error("malformed sample batch: {len} payload bytes for watermark {watermark}")]
    MalformedBatch {
        /// Payload length in bytes
        len: usize,
        /// Declared number of samples
        watermark: u16,
    },

    /// An RTC counter longer than 64 bits
    #[error("RTC counter of {0} bytes does not fit in 64 bits")]
    InvalidCounter(usize),

    /// Invalid parameter passed to an operation
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Opaque failure reported by the transport collaborator
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O error on an image or output file
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn page_read(addr: u32, source: Error) -> Self {
        Self::PageRead {
            addr,
            source: Box::new(source),
        }
    }

    pub(crate) fn erase(addr: u32, source: Error) -> Self {
        Self::Erase {
            addr,
            source: Box::new(source),
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
