//! Flash image decoding into timestamp-correlated samples
//!
//! Wires a [`StreamDecoder`] to a [`Reconstructor`]: RTC syncs become
//! pending timestamps, analog and accelerometer batches become samples.
//! Every other message class is skipped.

use std::io::Read;

use bluemo_core::decode::{
    DecoderEvent, ReconstructStats, Reconstructor, RecordSink, SampleBatch, Timestamp,
};
use bluemo_core::error::{Error, Result};

use crate::decoder::StreamDecoder;
use crate::message::Message;
use crate::protocol::MsgCode;

/// Chunk size used when reading an image
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Result of decoding a whole image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Bytes fed to the decoder
    pub bytes: u64,
    /// Messages handled (syncs and batches)
    pub messages: u64,
    /// Frames skipped because their class is not decoded
    pub skipped: u64,
    /// Trailing bytes that did not form a complete frame
    pub trailing: usize,
    /// Reconstructor counters
    pub stats: ReconstructStats,
}

fn on_rtc_sync<W: RecordSink>(recon: &mut Reconstructor<W>, msg: Message) -> Result<()> {
    match msg {
        Message::RtcSync { rtc_counter } => {
            let ts = Timestamp::from_counter(&rtc_counter)?;
            recon.apply(DecoderEvent::Timestamp(ts))
        }
        _ => Ok(()),
    }
}

fn on_batch<W: RecordSink>(recon: &mut Reconstructor<W>, msg: Message) -> Result<()> {
    let batch = match msg {
        Message::AdsAnalogStream {
            watermark, data, ..
        }
        | Message::AccelStream { watermark, data } => SampleBatch::new(data, watermark),
        _ => return Ok(()),
    };
    // A malformed batch aborts before any of its samples are emitted
    let values = batch.decode()?;
    recon.apply(DecoderEvent::Samples(values))
}

/// Decoder from raw image bytes to output records
pub struct TelemetryDecoder<'a, W: RecordSink + 'a> {
    stream: StreamDecoder<'a, Reconstructor<W>, Error>,
    recon: Reconstructor<W>,
    bytes: u64,
}

impl<'a, W: RecordSink + 'a> TelemetryDecoder<'a, W> {
    /// Create a decoder writing records to `sink`
    pub fn new(sink: W) -> Self {
        let mut stream = StreamDecoder::new();
        stream.set_default_msg_callback(MsgCode::RtcSync, on_rtc_sync::<W>);
        stream.set_default_msg_callback(MsgCode::AccelStream, on_batch::<W>);
        stream.set_default_msg_callback(MsgCode::AdsAnalogStream, on_batch::<W>);

        Self {
            stream,
            recon: Reconstructor::new(sink),
            bytes: 0,
        }
    }

    /// Feed the next chunk of the image
    ///
    /// Returns the number of messages handled.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<usize> {
        self.bytes += chunk.len() as u64;
        self.stream.feed(&mut self.recon, chunk)
    }

    /// Feed everything `reader` yields, `chunk_size` bytes at a time
    ///
    /// `on_chunk` is called with the size of every chunk fed.
    pub fn feed_reader<R: Read>(
        &mut self,
        mut reader: R,
        chunk_size: usize,
        mut on_chunk: impl FnMut(usize),
    ) -> Result<u64> {
        if chunk_size == 0 {
            return Err(Error::InvalidParameter("chunk size must be non-zero".into()));
        }

        let mut buf = vec![0u8; chunk_size];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            log::trace!("Decoding image at offset 0x{:08X}", self.bytes);
            self.feed(&buf[..n])?;
            on_chunk(n);
            total += n as u64;
        }
        Ok(total)
    }

    /// Reconstructor state so far
    pub fn reconstructor(&self) -> &Reconstructor<W> {
        &self.recon
    }

    /// End of input: flush the sink and return it with a summary
    pub fn finish(mut self) -> Result<(W, DecodeSummary)> {
        let trailing = self.stream.finish();
        let messages = self.stream.dispatched();
        let skipped = self.stream.skipped();
        let (sink, stats) = self.recon.finish()?;

        Ok((
            sink,
            DecodeSummary {
                bytes: self.bytes,
                messages,
                skipped,
                trailing,
                stats,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluemo_core::decode::OutputRecord;

    fn image() -> Vec<u8> {
        let mut bytes = Vec::new();
        for msg in [
            Message::RtcSync {
                rtc_counter: vec![0xE8, 0x03],
            },
            Message::AdsAnalogStream {
                instance: 0,
                watermark: 2,
                data: vec![0x0A, 0x00, 0xF6, 0xFF],
            },
            Message::DataSinkConfig {
                start_address: 0,
                write_address: 0,
            },
            Message::AccelStream {
                watermark: 1,
                data: vec![0x05, 0x00],
            },
        ] {
            bytes.extend(msg.encode().unwrap());
        }
        bytes
    }

    #[test]
    fn test_decode_image() {
        let mut decoder = TelemetryDecoder::new(Vec::<OutputRecord>::new());
        assert_eq!(decoder.feed(&image()).unwrap(), 3);
        let (records, summary) = decoder.finish().unwrap();

        let values: Vec<i16> = records.iter().map(|r| r.sample_value).collect();
        assert_eq!(values, vec![10, -10, 5]);
        assert_eq!(records[0].timestamp, Some(Timestamp::from_ticks(1000)));
        assert!(records[1].timestamp.is_none());
        assert_eq!(summary.messages, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.stats.records, 3);
    }

    #[test]
    fn test_feed_reader_chunks() {
        let bytes = image();
        let mut decoder = TelemetryDecoder::new(Vec::<OutputRecord>::new());
        let mut chunks = Vec::new();
        let total = decoder
            .feed_reader(bytes.as_slice(), 4, |n| chunks.push(n))
            .unwrap();
        assert_eq!(total, bytes.len() as u64);
        assert!(chunks.iter().all(|&n| n <= 4));

        let (records, summary) = decoder.finish().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(summary.bytes, bytes.len() as u64);
    }

    #[test]
    fn test_large_image_in_one_chunk() {
        let batch = Message::AdsAnalogStream {
            instance: 0,
            watermark: 1,
            data: vec![0x03, 0x00],
        }
        .encode()
        .unwrap();
        let count = 200_000;
        let image = batch.repeat(count);

        let mut decoder = TelemetryDecoder::new(Vec::<OutputRecord>::new());
        let total = decoder
            .feed_reader(image.as_slice(), image.len(), |_| {})
            .unwrap();
        assert_eq!(total, image.len() as u64);

        let (records, summary) = decoder.finish().unwrap();
        assert_eq!(records.len(), count);
        assert_eq!(summary.messages, count as u64);
        assert_eq!(summary.trailing, 0);
    }

    #[test]
    fn test_zero_chunk_size() {
        let mut decoder = TelemetryDecoder::new(Vec::<OutputRecord>::new());
        assert!(matches!(
            decoder.feed_reader(std::io::empty(), 0, |_| {}),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_malformed_batch_emits_nothing() {
        let mut bytes = Message::AdsAnalogStream {
            instance: 0,
            watermark: 1,
            data: vec![0x01, 0x00],
        }
        .encode()
        .unwrap();
        bytes.extend(
            Message::AdsAnalogStream {
                instance: 0,
                watermark: 3,
                data: vec![0x01, 0x00, 0x02],
            }
            .encode()
            .unwrap(),
        );

        let mut decoder = TelemetryDecoder::new(Vec::<OutputRecord>::new());
        let err = decoder.feed(&bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedBatch { len: 3, watermark: 3 }));
        assert_eq!(decoder.reconstructor().stats().records, 1);
    }
}
