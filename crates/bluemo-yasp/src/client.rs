//! YASP command client
//!
//! [`YaspClient`] sends one command frame and blocks until the matching
//! response arrives. Frames the device sends in between (stream data,
//! syncs routed to BLE) are logged and dropped.

use bluemo_core::decode::Timestamp;
use bluemo_core::error::{Error as CoreError, Result as CoreResult};
use bluemo_core::flash::{DataSinkInfo, DeviceSession, FlashInfo};

use crate::error::{Result, YaspError};
use crate::message::{AdsStreamParams, Command, Message};
use crate::protocol::{DataSink, Frame, Modify, MsgCode, HEADER_LEN};
use crate::transport::Transport;

/// Frames tolerated while waiting for one response
pub const MAX_UNSOLICITED: usize = 64;

/// Blocking YASP client over a transport
pub struct YaspClient<T: Transport> {
    transport: T,
}

impl<T: Transport> YaspClient<T> {
    /// Wrap a connected transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn recv_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_LEN];
        self.transport.read(&mut header)?;

        let len = u16::from_le_bytes([header[0], header[1]]) as usize;
        let mut payload = vec![0u8; len];
        self.transport.read(&mut payload)?;

        log::trace!("yasp: <- 0x{:02X} ({} bytes)", header[2], len);
        Ok(Frame::new(header[2], payload))
    }

    /// Send a command without waiting for its response
    ///
    /// Whatever the device answers is skipped as unsolicited by the next
    /// [`send_command`](Self::send_command). Used for commands whose
    /// response may be routed to a data sink instead of the link.
    pub fn post_command(&mut self, cmd: &Command) -> Result<()> {
        let bytes = cmd.to_frame().encode()?;
        log::trace!("yasp: -> 0x{:02X} ({} bytes)", cmd.code().command_code(), bytes.len());
        self.transport.write(&bytes)?;
        self.transport.flush()
    }

    /// Send a command and wait for its response
    ///
    /// # Errors
    /// * `DeviceError` - the device answered with an error message for this
    ///   command
    /// * `UnexpectedResponse` - more than [`MAX_UNSOLICITED`] unrelated
    ///   frames arrived first
    /// * `Timeout` - the transport timed out
    pub fn send_command(&mut self, cmd: &Command) -> Result<Message> {
        let code = cmd.code();
        self.post_command(cmd)?;

        let mut last = 0;
        for _ in 0..=MAX_UNSOLICITED {
            let frame = self.recv_frame()?;
            last = frame.code;

            if frame.code == code.response_code() {
                return Message::decode(&frame);
            }

            if frame.code == MsgCode::Error.response_code() {
                if let Ok(Message::Error {
                    error_code,
                    command_code,
                }) = Message::decode(&frame)
                {
                    if command_code == code.command_code() {
                        return Err(YaspError::DeviceError {
                            command: command_code,
                            error_code,
                        });
                    }
                }
            }

            log::debug!(
                "yasp: ignoring unsolicited frame 0x{:02X} ({} bytes) while waiting for 0x{:02X}",
                frame.code,
                frame.payload.len(),
                code.response_code()
            );
        }

        Err(YaspError::UnexpectedResponse {
            command: code.command_code(),
            response: last,
        })
    }

    /// Read the RTC counter
    pub fn rtc_sync(&mut self) -> Result<Timestamp> {
        match self.send_command(&Command::RtcSync)? {
            Message::RtcSync { rtc_counter } => Timestamp::from_counter(&rtc_counter)
                .map_err(|e| YaspError::payload(MsgCode::RtcSync.response_code(), e.to_string())),
            other => Err(mismatch(MsgCode::RtcSync, &other)),
        }
    }

    /// Route messages of class `code` to `sink`
    pub fn data_sink_control(&mut self, code: MsgCode, sink: DataSink) -> Result<Message> {
        self.send_command(&Command::DataSinkControl {
            modify: Modify::Modify,
            command_code: code.command_code(),
            sink,
        })
    }

    /// Configure and start the ADS analog stream
    ///
    /// With `AdsDataRate::SingleSample` the response carries the sample.
    pub fn ads_analog_stream(&mut self, params: AdsStreamParams) -> Result<Message> {
        self.send_command(&Command::AdsAnalogStream(params))
    }

    /// Update the BLE connection interval
    pub fn conn_param_update(&mut self, conn_handle: u8, conn_interval_max: u16) -> Result<Message> {
        self.send_command(&Command::ConnParamUpdate {
            modify: Modify::Modify,
            conn_handle,
            conn_interval_max,
        })
    }
}

fn mismatch(expected: MsgCode, got: &Message) -> YaspError {
    YaspError::UnexpectedResponse {
        command: expected.command_code(),
        response: got.response_code(),
    }
}

impl<T: Transport> DeviceSession for YaspClient<T> {
    fn data_sink_config(&mut self) -> CoreResult<DataSinkInfo> {
        match self.send_command(&Command::DataSinkConfig)? {
            Message::DataSinkConfig {
                start_address,
                write_address,
            } => Ok(DataSinkInfo {
                start_address,
                write_address,
            }),
            other => Err(mismatch(MsgCode::DataSinkConfig, &other).into()),
        }
    }

    fn flash_init(&mut self) -> CoreResult<FlashInfo> {
        match self.send_command(&Command::SpiFlashInit)? {
            Message::SpiFlashInit {
                block_size,
                flash_size_kib,
                page_size,
            } => Ok(FlashInfo {
                block_size,
                flash_size_kib: flash_size_kib as u32,
                page_size: page_size as u32,
            }),
            other => Err(mismatch(MsgCode::SpiFlashInit, &other).into()),
        }
    }

    fn flash_read(&mut self, addr: u32, len: u32) -> CoreResult<Vec<u8>> {
        let len = u16::try_from(len).map_err(|_| {
            CoreError::InvalidParameter(format!("read of {} bytes exceeds one frame", len))
        })?;

        match self.send_command(&Command::SpiFlashRead { address: addr, len })? {
            Message::SpiFlashRead { address, data } if address == addr => Ok(data),
            Message::SpiFlashRead { address, .. } => Err(CoreError::Transport(format!(
                "read response for 0x{:08X}, expected 0x{:08X}",
                address, addr
            ))),
            other => Err(mismatch(MsgCode::SpiFlashRead, &other).into()),
        }
    }

    fn flash_erase(&mut self, addr: u32, len: u32) -> CoreResult<()> {
        let rsp = self.send_command(&Command::SpiFlashErase { address: addr, len })?;
        log::debug!("Erase response: {:?}", rsp);
        Ok(())
    }

    fn soft_reset(&mut self) -> CoreResult<()> {
        self.send_command(&Command::SoftReset)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Transport answering from a script of queued bytes
    #[derive(Default)]
    struct MockTransport {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
    }

    impl MockTransport {
        fn queue(&mut self, msg: &Message) {
            self.inbound.extend(msg.encode().unwrap());
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.outbound.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            if self.inbound.len() < buf.len() {
                return Err(YaspError::Timeout);
            }
            for b in buf.iter_mut() {
                *b = self.inbound.pop_front().unwrap();
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_flash_read() {
        let mut t = MockTransport::default();
        t.queue(&Message::SpiFlashRead {
            address: 0x100,
            data: vec![1, 2, 3, 4],
        });
        let mut client = YaspClient::new(t);

        assert_eq!(client.flash_read(0x100, 4).unwrap(), vec![1, 2, 3, 4]);
        let t = client.into_inner();
        assert_eq!(t.outbound, vec![0x06, 0x00, 0x19, 0x00, 0x01, 0x00, 0x00, 0x04, 0x00]);
    }

    #[test]
    fn test_flash_read_too_large() {
        let mut client = YaspClient::new(MockTransport::default());
        assert!(matches!(
            client.flash_read(0, 0x1_0000),
            Err(CoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_flash_read_wrong_address() {
        let mut t = MockTransport::default();
        t.queue(&Message::SpiFlashRead {
            address: 0x200,
            data: vec![0; 4],
        });
        let mut client = YaspClient::new(t);
        assert!(matches!(
            client.flash_read(0x100, 4),
            Err(CoreError::Transport(_))
        ));
    }

    #[test]
    fn test_skips_unsolicited_frames() {
        let mut t = MockTransport::default();
        t.queue(&Message::AdsAnalogStream {
            instance: 0,
            watermark: 1,
            data: vec![0, 0],
        });
        t.queue(&Message::RtcSync {
            rtc_counter: vec![0x01],
        });
        t.queue(&Message::SpiFlashInit {
            block_size: 4096,
            flash_size_kib: 16,
            page_size: 256,
        });
        let mut client = YaspClient::new(t);

        let info = client.flash_init().unwrap();
        assert_eq!(info.block_size, 4096);
        assert_eq!(info.flash_size(), 16 * 1024);
        assert_eq!(info.page_size, 256);
    }

    #[test]
    fn test_error_response() {
        let mut t = MockTransport::default();
        t.queue(&Message::Error {
            error_code: 3,
            command_code: MsgCode::SpiFlashErase.command_code(),
        });
        let mut client = YaspClient::new(t);

        let err = client
            .send_command(&Command::SpiFlashErase {
                address: 0,
                len: 4096,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            YaspError::DeviceError {
                command: 0x1A,
                error_code: 3
            }
        ));
    }

    #[test]
    fn test_error_for_other_command_is_skipped() {
        let mut t = MockTransport::default();
        t.queue(&Message::Error {
            error_code: 1,
            command_code: MsgCode::AdsAnalogStream.command_code(),
        });
        t.queue(&Message::SoftReset);
        let mut client = YaspClient::new(t);
        client.soft_reset().unwrap();
    }

    #[test]
    fn test_too_many_unsolicited() {
        let mut t = MockTransport::default();
        for _ in 0..=MAX_UNSOLICITED {
            t.queue(&Message::RtcSync {
                rtc_counter: vec![],
            });
        }
        t.queue(&Message::SoftReset);
        let mut client = YaspClient::new(t);
        assert!(matches!(
            client.send_command(&Command::SoftReset),
            Err(YaspError::UnexpectedResponse {
                command: 0x01,
                response: 0x88
            })
        ));
    }

    #[test]
    fn test_post_then_send() {
        let mut t = MockTransport::default();
        // Answer to the posted sync arrives before the config response
        t.queue(&Message::RtcSync {
            rtc_counter: vec![0x05],
        });
        t.queue(&Message::DataSinkConfig {
            start_address: 0x1000,
            write_address: 0x1234,
        });
        let mut client = YaspClient::new(t);

        client.post_command(&Command::RtcSync).unwrap();
        let sink = client.data_sink_config().unwrap();
        assert_eq!(sink.write_address, 0x1234);

        let t = client.into_inner();
        assert_eq!(&t.outbound[..3], &[0x00, 0x00, 0x08]);
        assert_eq!(&t.outbound[3..], &[0x00, 0x00, 0x10]);
    }

    #[test]
    fn test_timeout() {
        let mut client = YaspClient::new(MockTransport::default());
        assert!(matches!(
            client.send_command(&Command::RtcSync),
            Err(YaspError::Timeout)
        ));
    }

    #[test]
    fn test_rtc_sync() {
        let mut t = MockTransport::default();
        t.queue(&Message::RtcSync {
            rtc_counter: vec![0x00, 0x80],
        });
        let mut client = YaspClient::new(t);
        assert_eq!(client.rtc_sync().unwrap().ticks, 32768);
    }
}
