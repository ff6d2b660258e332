//! Error types for YASP operations

use thiserror::Error;

/// YASP-specific errors
#[derive(Debug, Error)]
pub enum YaspError {
    /// Failed to connect to the device
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// No complete response arrived in time
    #[error("Communication timeout")]
    Timeout,

    /// Payload does not match the layout of its message code
    #[error("Invalid payload for message 0x{code:02X}: {reason}")]
    InvalidPayload { code: u8, reason: String },

    /// Too many frames that did not answer the pending command
    #[error("No response to command 0x{command:02X} (last frame 0x{response:02X})")]
    UnexpectedResponse { command: u8, response: u8 },

    /// The device answered with an error message
    #[error("Device rejected command 0x{command:02X} with error {error_code}")]
    DeviceError { command: u8, error_code: u8 },

    /// Command payload does not fit in one frame
    #[error("Payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),
}

/// Result type for YASP operations
pub type Result<T> = core::result::Result<T, YaspError>;

impl YaspError {
    pub(crate) fn payload(code: u8, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            code,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for YaspError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => YaspError::Timeout,
            _ => YaspError::IoError(e.to_string()),
        }
    }
}

impl From<YaspError> for bluemo_core::Error {
    fn from(e: YaspError) -> Self {
        bluemo_core::Error::Transport(e.to_string())
    }
}
