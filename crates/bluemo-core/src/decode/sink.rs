//! Output record sinks

use std::io::Write;

use super::reconstruct::OutputRecord;
use crate::error::Result;

/// Destination for reconstructed records
pub trait RecordSink {
    /// Write one record
    fn write_record(&mut self, record: &OutputRecord) -> Result<()>;

    /// Flush buffered records
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<OutputRecord> {
    fn write_record(&mut self, record: &OutputRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Comma-separated text sink
///
/// Every record starts on a new line: `\n{index},{value}`, followed by
/// `,{ticks}` when a timestamp is attached. There is no header.
pub struct CsvSink<W: Write> {
    writer: W,
}

impl<W: Write> CsvSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Get the underlying writer back
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &OutputRecord) -> Result<()> {
        write!(
            self.writer,
            "\n{},{}",
            record.sequence_index, record.sample_value
        )?;
        if let Some(ts) = record.timestamp {
            write!(self.writer, ",{}", ts.ticks)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Timestamp;

    #[test]
    fn test_csv_format() {
        let mut sink = CsvSink::new(Vec::new());
        sink.write_record(&OutputRecord {
            sequence_index: 0,
            sample_value: -12,
            timestamp: Some(Timestamp::from_ticks(32768)),
        })
        .unwrap();
        sink.write_record(&OutputRecord {
            sequence_index: 1,
            sample_value: 7,
            timestamp: None,
        })
        .unwrap();
        sink.flush().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "\n0,-12,32768\n1,7");
    }
}
