//! Decode command implementation

use bluemo_core::decode::CsvSink;
use bluemo_yasp::{DecodeSummary, TelemetryDecoder};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use super::create_progress_bar;

/// Decode a flash image file into a record file
///
/// Records already written stay in `output` if decoding fails part way.
pub fn run_decode(
    input: &Path,
    output: &Path,
    chunk_size: usize,
) -> Result<DecodeSummary, Box<dyn std::error::Error>> {
    println!("Parsing {:?}...", input);

    let file = File::open(input)?;
    let total = file.metadata()?.len();
    let writer = BufWriter::new(File::create(output)?);

    let summary = decode_image(file, total, writer, chunk_size)?;

    println!(
        "Decoded {} messages into {} records ({} timestamped, {} syncs dropped)",
        summary.messages,
        summary.stats.records,
        summary.stats.timestamps_attached,
        summary.stats.timestamps_dropped
    );
    if summary.skipped > 0 {
        println!("Skipped {} frames of other message types", summary.skipped);
    }
    println!("Wrote {:?}", output);

    Ok(summary)
}

/// Decode `total` bytes from `reader` as CSV records into `writer`
///
/// On a decode error the records emitted so far are still flushed. A failed
/// flush is logged and the decode error is returned.
fn decode_image<R: Read, W: Write>(
    reader: R,
    total: u64,
    writer: W,
    chunk_size: usize,
) -> Result<DecodeSummary, Box<dyn std::error::Error>> {
    let pb = create_progress_bar(total, "Decoding")?;
    let mut decoder = TelemetryDecoder::new(CsvSink::new(writer));

    if let Err(e) = decoder.feed_reader(reader, chunk_size, |n| pb.inc(n as u64)) {
        pb.abandon_with_message("Decode failed");
        if let Err(flush) = decoder.finish() {
            log::warn!("Failed to flush partial output: {}", flush);
        }
        return Err(e.into());
    }

    let (_, summary) = decoder.finish()?;
    pb.finish_with_message("Decode complete");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluemo_yasp::Message;

    fn write_image(path: &Path, msgs: &[Message]) {
        let mut bytes = Vec::new();
        for msg in msgs {
            bytes.extend(msg.encode().unwrap());
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_decode_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("nvm_data.dat");
        let output = dir.path().join("parsed_data.csv");
        write_image(
            &input,
            &[
                Message::RtcSync {
                    rtc_counter: vec![0x00, 0x80],
                },
                Message::AdsAnalogStream {
                    instance: 0,
                    watermark: 3,
                    data: vec![0x01, 0x00, 0x02, 0x00, 0xFD, 0xFF],
                },
            ],
        );

        let summary = run_decode(&input, &output, 512).unwrap();
        assert_eq!(summary.stats.records, 3);

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text, "\n0,1,32768\n1,2\n2,-3");
    }

    #[test]
    fn test_decode_keeps_records_before_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("nvm_data.dat");
        let output = dir.path().join("parsed_data.csv");
        write_image(
            &input,
            &[
                Message::AdsAnalogStream {
                    instance: 0,
                    watermark: 1,
                    data: vec![0x07, 0x00],
                },
                Message::AdsAnalogStream {
                    instance: 0,
                    watermark: 2,
                    data: vec![0x07],
                },
            ],
        );

        assert!(run_decode(&input, &output, 512).is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "\n0,7");
    }

    /// Writer that accepts everything but fails every flush
    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("device full"))
        }
    }

    #[test]
    fn test_flush_failure_keeps_decode_error() {
        let mut image = Vec::new();
        for msg in [
            Message::AdsAnalogStream {
                instance: 0,
                watermark: 1,
                data: vec![0x07, 0x00],
            },
            Message::AccelStream {
                watermark: 2,
                data: vec![0x07],
            },
        ] {
            image.extend(msg.encode().unwrap());
        }

        let err = decode_image(
            image.as_slice(),
            image.len() as u64,
            FailingFlush(Vec::new()),
            512,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<bluemo_core::Error>(),
            Some(bluemo_core::Error::MalformedBatch { len: 1, watermark: 2 })
        ));
    }

    #[test]
    fn test_flush_failure_after_clean_decode() {
        let image = Message::AdsAnalogStream {
            instance: 0,
            watermark: 1,
            data: vec![0x07, 0x00],
        }
        .encode()
        .unwrap();

        let err = decode_image(
            image.as_slice(),
            image.len() as u64,
            FailingFlush(Vec::new()),
            512,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<bluemo_core::Error>(),
            Some(bluemo_core::Error::Io(_))
        ));
    }

    #[test]
    fn test_decode_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("parsed_data.csv");
        assert!(run_decode(&dir.path().join("missing.dat"), &output, 512).is_err());
    }
}
