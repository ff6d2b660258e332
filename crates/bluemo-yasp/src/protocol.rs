//! YASP protocol constants, frames and parameter enums
//!
//! Every message on the wire (and in the flash image) is one frame:
//!
//! ```text
//! +--------+--------+------+----------------+
//! | len lo | len hi | code | payload[len]   |
//! +--------+--------+------+----------------+
//! ```
//!
//! `len` counts payload bytes only. Commands use codes below `0x80`; the
//! response to a command (and any unsolicited message of the same class)
//! carries the command code with [`RESPONSE_FLAG`] set.

use crate::error::{Result, YaspError};

/// Bytes before the payload: 16-bit length plus code
pub const HEADER_LEN: usize = 3;

/// Largest payload a frame can carry
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Set on the code of every response frame
pub const RESPONSE_FLAG: u8 = 0x80;

/// Message classes, identified by their command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MsgCode {
    /// Error report for a rejected command
    Error = 0x00,
    /// Reset the device
    SoftReset = 0x01,
    /// Change BLE connection parameters
    ConnParamUpdate = 0x05,
    /// Read the RTC counter
    RtcSync = 0x08,
    /// Query the data sink (start and write addresses)
    DataSinkConfig = 0x10,
    /// Route a message class to a data sink
    DataSinkControl = 0x11,
    /// Initialize SPI flash and report its geometry
    SpiFlashInit = 0x18,
    /// Read SPI flash
    SpiFlashRead = 0x19,
    /// Erase SPI flash
    SpiFlashErase = 0x1A,
    /// Accelerometer sample stream
    AccelStream = 0x20,
    /// ADS analog sample stream
    AdsAnalogStream = 0x28,
}

impl MsgCode {
    /// All known message classes
    pub const ALL: [MsgCode; 11] = [
        MsgCode::Error,
        MsgCode::SoftReset,
        MsgCode::ConnParamUpdate,
        MsgCode::RtcSync,
        MsgCode::DataSinkConfig,
        MsgCode::DataSinkControl,
        MsgCode::SpiFlashInit,
        MsgCode::SpiFlashRead,
        MsgCode::SpiFlashErase,
        MsgCode::AccelStream,
        MsgCode::AdsAnalogStream,
    ];

    /// Code used when sending this message as a command
    pub fn command_code(self) -> u8 {
        self as u8
    }

    /// Code carried by responses of this class
    pub fn response_code(self) -> u8 {
        self as u8 | RESPONSE_FLAG
    }

    /// Look up a class by its command code
    pub fn from_command_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.command_code() == code)
    }

    /// Look up a class by a response code
    pub fn from_response_code(code: u8) -> Option<Self> {
        if code & RESPONSE_FLAG == 0 {
            return None;
        }
        Self::from_command_code(code & !RESPONSE_FLAG)
    }
}

/// Read or modify selector for configuration commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Modify {
    /// Query the current setting
    Read = 0,
    /// Change the setting
    Modify = 1,
}

/// Where the device sends messages of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataSink {
    /// Send over the BLE link
    Ble = 0,
    /// Append to SPI flash
    SpiFlash = 1,
}

impl DataSink {
    /// Decode from a wire byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataSink::Ble),
            1 => Some(DataSink::SpiFlash),
            _ => None,
        }
    }
}

/// ADS programmable gain (full-scale range)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdsPga {
    /// ±6.144 V
    Fsr6p144 = 0,
    /// ±4.096 V
    Fsr4p096 = 1,
    /// ±2.048 V
    Fsr2p048 = 2,
    /// ±1.024 V
    Fsr1p024 = 3,
    /// ±0.512 V
    Fsr0p512 = 4,
    /// ±0.256 V
    Fsr0p256 = 5,
}

/// ADS conversion rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdsDataRate {
    /// One conversion, reported immediately
    SingleSample = 0,
    Sps8 = 1,
    Sps16 = 2,
    Sps32 = 3,
    Sps64 = 4,
    Sps128 = 5,
    Sps250 = 6,
    Sps475 = 7,
    Sps860 = 8,
    /// Conversions paced by `custom_period`
    CustomPeriod = 9,
}

/// ADS input multiplexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdsInputMux {
    Ain0Ain1 = 0,
    Ain0Ain3 = 1,
    Ain1Ain3 = 2,
    Ain2Ain3 = 3,
    Ain0Gnd = 4,
    Ain1Gnd = 5,
    Ain2Gnd = 6,
    Ain3Gnd = 7,
}

/// A raw frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command or response code
    pub code: u8,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame
    pub fn new(code: u8, payload: Vec<u8>) -> Self {
        Self { code, payload }
    }

    /// Serialize the frame
    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = u16::try_from(self.payload.len())
            .map_err(|_| YaspError::PayloadTooLarge(self.payload.len()))?;

        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&len.to_le_bytes());
        out.push(self.code);
        out.extend_from_slice(&self.payload);
        Ok(out)
    }
}

/// Reassembles frames from arbitrarily split input
///
/// Consumed frames only advance a read offset; the buffer is compacted on
/// the next `push`, so draining a large buffer stays linear.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    start: usize,
}

impl FrameBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Frame> {
        let avail = &self.buf[self.start..];
        if avail.len() < HEADER_LEN {
            return None;
        }

        let len = u16::from_le_bytes([avail[0], avail[1]]) as usize;
        let total = HEADER_LEN + len;
        if avail.len() < total {
            return None;
        }

        let code = avail[2];
        let payload = avail[HEADER_LEN..total].to_vec();
        self.start += total;

        log::trace!("yasp: frame 0x{:02X} ({} bytes)", code, len);
        Some(Frame { code, payload })
    }

    /// Bytes that do not (yet) form a complete frame
    pub fn pending(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// Drop buffered bytes
    pub fn clear(&mut self) {
        self.buf.clear();
        self.start = 0;
    }
}

/// Sequential reader over a payload
pub(crate) struct PayloadReader<'a> {
    code: u8,
    data: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(code: u8, data: &'a [u8]) -> Self {
        Self { code, data }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.data.len() < n {
            return Err(YaspError::payload(
                self.code,
                format!("truncated {} ({} of {} bytes)", what, self.data.len(), n),
            ));
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &str) -> Result<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Remaining bytes
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        core::mem::take(&mut self.data)
    }

    /// Fail if bytes are left over
    pub(crate) fn finish(self) -> Result<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(YaspError::payload(
                self.code,
                format!("{} trailing bytes", self.data.len()),
            ))
        }
    }
}
