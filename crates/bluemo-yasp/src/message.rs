//! Typed YASP commands and messages
//!
//! [`Command`] is what the host sends. [`Message`] is what the device sends
//! back, either as the response to a command or unsolicited (stream data,
//! RTC syncs routed to a data sink). Both serialize to a [`Frame`].
//!
//! Multi-byte fields are little-endian.

use crate::error::{Result, YaspError};
use crate::protocol::{
    AdsDataRate, AdsInputMux, AdsPga, DataSink, Frame, Modify, MsgCode, PayloadReader,
};

/// Parameters of the ADS analog stream command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdsStreamParams {
    /// ADC instance on the device
    pub instance: u8,
    /// Programmable gain
    pub pga: AdsPga,
    /// Conversion rate
    pub data_rate: AdsDataRate,
    /// Input multiplexer setting
    pub input_mux: AdsInputMux,
    /// Sample period when `data_rate` is `CustomPeriod`
    pub custom_period: u16,
    /// Samples per stream message
    pub watermark: u16,
}

impl Default for AdsStreamParams {
    fn default() -> Self {
        Self {
            instance: 0,
            pga: AdsPga::Fsr2p048,
            data_rate: AdsDataRate::SingleSample,
            input_mux: AdsInputMux::Ain0Ain1,
            custom_period: 0,
            watermark: 1,
        }
    }
}

/// Host to device commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reset the device
    SoftReset,
    /// Update BLE connection parameters
    ConnParamUpdate {
        /// Read or modify
        modify: Modify,
        /// BLE connection handle
        conn_handle: u8,
        /// Maximum connection interval in 1.25 ms units
        conn_interval_max: u16,
    },
    /// Read the RTC counter
    RtcSync,
    /// Query the data sink
    DataSinkConfig,
    /// Route a message class to a data sink
    DataSinkControl {
        /// Read or modify
        modify: Modify,
        /// Command code of the routed class
        command_code: u8,
        /// Destination
        sink: DataSink,
    },
    /// Initialize SPI flash
    SpiFlashInit,
    /// Read SPI flash
    SpiFlashRead {
        /// Start address
        address: u32,
        /// Bytes to read
        len: u16,
    },
    /// Erase SPI flash
    SpiFlashErase {
        /// Start address
        address: u32,
        /// Bytes to erase
        len: u32,
    },
    /// Start (or sample) the ADS analog stream
    AdsAnalogStream(AdsStreamParams),
}

impl Command {
    /// Message class of this command
    pub fn code(&self) -> MsgCode {
        match self {
            Command::SoftReset => MsgCode::SoftReset,
            Command::ConnParamUpdate { .. } => MsgCode::ConnParamUpdate,
            Command::RtcSync => MsgCode::RtcSync,
            Command::DataSinkConfig => MsgCode::DataSinkConfig,
            Command::DataSinkControl { .. } => MsgCode::DataSinkControl,
            Command::SpiFlashInit => MsgCode::SpiFlashInit,
            Command::SpiFlashRead { .. } => MsgCode::SpiFlashRead,
            Command::SpiFlashErase { .. } => MsgCode::SpiFlashErase,
            Command::AdsAnalogStream(_) => MsgCode::AdsAnalogStream,
        }
    }

    /// Serialize the command parameters
    pub fn payload(&self) -> Vec<u8> {
        let mut p = Vec::new();
        match *self {
            Command::SoftReset
            | Command::RtcSync
            | Command::DataSinkConfig
            | Command::SpiFlashInit => {}
            Command::ConnParamUpdate {
                modify,
                conn_handle,
                conn_interval_max,
            } => {
                p.push(modify as u8);
                p.push(conn_handle);
                p.extend_from_slice(&conn_interval_max.to_le_bytes());
            }
            Command::DataSinkControl {
                modify,
                command_code,
                sink,
            } => {
                p.extend_from_slice(&[modify as u8, command_code, sink as u8]);
            }
            Command::SpiFlashRead { address, len } => {
                p.extend_from_slice(&address.to_le_bytes());
                p.extend_from_slice(&len.to_le_bytes());
            }
            Command::SpiFlashErase { address, len } => {
                p.extend_from_slice(&address.to_le_bytes());
                p.extend_from_slice(&len.to_le_bytes());
            }
            Command::AdsAnalogStream(params) => {
                p.extend_from_slice(&[
                    params.instance,
                    params.pga as u8,
                    params.data_rate as u8,
                    params.input_mux as u8,
                ]);
                p.extend_from_slice(&params.custom_period.to_le_bytes());
                p.extend_from_slice(&params.watermark.to_le_bytes());
            }
        }
        p
    }

    /// Build the command frame
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.code().command_code(), self.payload())
    }
}

/// Device to host messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A command was rejected
    Error {
        /// Device error code
        error_code: u8,
        /// Command code of the rejected command
        command_code: u8,
    },
    /// Reset acknowledged
    SoftReset,
    /// Current connection parameters
    ConnParamUpdate {
        /// BLE connection handle
        conn_handle: u8,
        /// Connection interval in 1.25 ms units
        conn_interval: u16,
    },
    /// RTC counter, significant low bytes only
    RtcSync {
        /// Little-endian counter bytes
        rtc_counter: Vec<u8>,
    },
    /// Data sink configuration
    DataSinkConfig {
        /// First address the data sink writes to
        start_address: u32,
        /// Next address the data sink will write
        write_address: u32,
    },
    /// Data sink routing
    DataSinkControl {
        /// Command code of the routed class
        command_code: u8,
        /// Destination
        sink: DataSink,
    },
    /// SPI flash geometry
    SpiFlashInit {
        /// Erase block size in bytes
        block_size: u32,
        /// Flash size in KiB
        flash_size_kib: u16,
        /// Page size in bytes
        page_size: u16,
    },
    /// SPI flash data
    SpiFlashRead {
        /// Address the data was read from
        address: u32,
        /// Flash content
        data: Vec<u8>,
    },
    /// Erase acknowledged
    SpiFlashErase {
        /// Start address
        address: u32,
        /// Bytes erased
        len: u32,
    },
    /// Accelerometer samples
    AccelStream {
        /// Number of samples in `data`
        watermark: u16,
        /// Packed samples
        data: Vec<u8>,
    },
    /// ADS analog samples
    AdsAnalogStream {
        /// ADC instance
        instance: u8,
        /// Number of samples in `data`
        watermark: u16,
        /// Packed samples
        data: Vec<u8>,
    },
}

impl Message {
    /// Message class
    pub fn code(&self) -> MsgCode {
        match self {
            Message::Error { .. } => MsgCode::Error,
            Message::SoftReset => MsgCode::SoftReset,
            Message::ConnParamUpdate { .. } => MsgCode::ConnParamUpdate,
            Message::RtcSync { .. } => MsgCode::RtcSync,
            Message::DataSinkConfig { .. } => MsgCode::DataSinkConfig,
            Message::DataSinkControl { .. } => MsgCode::DataSinkControl,
            Message::SpiFlashInit { .. } => MsgCode::SpiFlashInit,
            Message::SpiFlashRead { .. } => MsgCode::SpiFlashRead,
            Message::SpiFlashErase { .. } => MsgCode::SpiFlashErase,
            Message::AccelStream { .. } => MsgCode::AccelStream,
            Message::AdsAnalogStream { .. } => MsgCode::AdsAnalogStream,
        }
    }

    /// Response code tagging this message on the wire
    pub fn response_code(&self) -> u8 {
        self.code().response_code()
    }

    /// Decode a response frame
    ///
    /// # Errors
    /// * `InvalidPayload` - unknown code, or a payload that does not match
    ///   the layout of its code
    pub fn decode(frame: &Frame) -> Result<Self> {
        let code = MsgCode::from_response_code(frame.code)
            .ok_or_else(|| YaspError::payload(frame.code, "unknown response code"))?;
        let mut r = PayloadReader::new(frame.code, &frame.payload);

        let msg = match code {
            MsgCode::Error => Message::Error {
                error_code: r.u8("error code")?,
                command_code: r.u8("command code")?,
            },
            MsgCode::SoftReset => Message::SoftReset,
            MsgCode::ConnParamUpdate => Message::ConnParamUpdate {
                conn_handle: r.u8("connection handle")?,
                conn_interval: r.u16("connection interval")?,
            },
            MsgCode::RtcSync => Message::RtcSync {
                rtc_counter: r.rest().to_vec(),
            },
            MsgCode::DataSinkConfig => Message::DataSinkConfig {
                start_address: r.u32("start address")?,
                write_address: r.u32("write address")?,
            },
            MsgCode::DataSinkControl => {
                let command_code = r.u8("command code")?;
                let raw = r.u8("sink")?;
                let sink = DataSink::from_u8(raw).ok_or_else(|| {
                    YaspError::payload(frame.code, format!("unknown data sink {}", raw))
                })?;
                Message::DataSinkControl { command_code, sink }
            }
            MsgCode::SpiFlashInit => Message::SpiFlashInit {
                block_size: r.u32("block size")?,
                flash_size_kib: r.u16("flash size")?,
                page_size: r.u16("page size")?,
            },
            MsgCode::SpiFlashRead => Message::SpiFlashRead {
                address: r.u32("address")?,
                data: r.rest().to_vec(),
            },
            MsgCode::SpiFlashErase => Message::SpiFlashErase {
                address: r.u32("address")?,
                len: r.u32("length")?,
            },
            MsgCode::AccelStream => Message::AccelStream {
                watermark: r.u16("watermark")?,
                data: r.rest().to_vec(),
            },
            MsgCode::AdsAnalogStream => Message::AdsAnalogStream {
                instance: r.u8("instance")?,
                watermark: r.u16("watermark")?,
                data: r.rest().to_vec(),
            },
        };

        r.finish()?;
        Ok(msg)
    }

    /// Serialize as a response frame
    ///
    /// Used by device emulators and to build flash images.
    pub fn to_frame(&self) -> Frame {
        let mut p = Vec::new();
        match self {
            Message::Error {
                error_code,
                command_code,
            } => p.extend_from_slice(&[*error_code, *command_code]),
            Message::SoftReset => {}
            Message::ConnParamUpdate {
                conn_handle,
                conn_interval,
            } => {
                p.push(*conn_handle);
                p.extend_from_slice(&conn_interval.to_le_bytes());
            }
            Message::RtcSync { rtc_counter } => p.extend_from_slice(rtc_counter),
            Message::DataSinkConfig {
                start_address,
                write_address,
            } => {
                p.extend_from_slice(&start_address.to_le_bytes());
                p.extend_from_slice(&write_address.to_le_bytes());
            }
            Message::DataSinkControl { command_code, sink } => {
                p.extend_from_slice(&[*command_code, *sink as u8])
            }
            Message::SpiFlashInit {
                block_size,
                flash_size_kib,
                page_size,
            } => {
                p.extend_from_slice(&block_size.to_le_bytes());
                p.extend_from_slice(&flash_size_kib.to_le_bytes());
                p.extend_from_slice(&page_size.to_le_bytes());
            }
            Message::SpiFlashRead { address, data } => {
                p.extend_from_slice(&address.to_le_bytes());
                p.extend_from_slice(data);
            }
            Message::SpiFlashErase { address, len } => {
                p.extend_from_slice(&address.to_le_bytes());
                p.extend_from_slice(&len.to_le_bytes());
            }
            Message::AccelStream { watermark, data } => {
                p.extend_from_slice(&watermark.to_le_bytes());
                p.extend_from_slice(data);
            }
            Message::AdsAnalogStream {
                instance,
                watermark,
                data,
            } => {
                p.push(*instance);
                p.extend_from_slice(&watermark.to_le_bytes());
                p.extend_from_slice(data);
            }
        }
        Frame::new(self.response_code(), p)
    }

    /// Serialize as wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_frame().encode()
    }
}
