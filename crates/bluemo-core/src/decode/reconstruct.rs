//! Timestamp-correlated sample reconstruction

use super::rtc::Timestamp;
use super::sink::RecordSink;
use crate::error::Result;

/// Input to the reconstructor, in stream order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// An RTC-sync message was decoded
    Timestamp(Timestamp),
    /// A sample batch was decoded and validated
    Samples(Vec<i16>),
}

/// One reconstructed sample
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// Position of the sample in the decode session
    pub sequence_index: u64,
    /// Sample value
    pub sample_value: i16,
    /// Device time, present on the first sample after an RTC sync
    pub timestamp: Option<Timestamp>,
}

impl OutputRecord {
    /// Attached timestamp in seconds since device reset
    pub fn timestamp_seconds(&self) -> Option<f64> {
        self.timestamp.map(|ts| ts.seconds())
    }
}

/// Counters collected while reconstructing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructStats {
    /// Records emitted
    pub records: u64,
    /// Timestamps attached to a record
    pub timestamps_attached: u64,
    /// Timestamps overwritten before any sample followed them
    pub timestamps_dropped: u64,
}

/// Stateful decoder turning events into output records
///
/// A pending timestamp is attached to the next sample emitted and then
/// cleared. A second sync before any sample replaces the first, which is
/// lost. Sequence indices increase by one per sample and never reset.
pub struct Reconstructor<W: RecordSink> {
    sink: W,
    pending: Option<Timestamp>,
    sequence_index: u64,
    stats: ReconstructStats,
}

impl<W: RecordSink> Reconstructor<W> {
    /// Create a reconstructor writing to `sink`
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            pending: None,
            sequence_index: 0,
            stats: ReconstructStats::default(),
        }
    }

    /// Apply one event
    ///
    /// # Errors
    /// Returns the sink's error if a record cannot be written.
    pub fn apply(&mut self, event: DecoderEvent) -> Result<()> {
        match event {
            DecoderEvent::Timestamp(ts) => {
                self.set_pending(ts);
                Ok(())
            }
            DecoderEvent::Samples(values) => self.emit(&values),
        }
    }

    fn set_pending(&mut self, ts: Timestamp) {
        if let Some(old) = self.pending {
            log::debug!(
                "Dropping timestamp {} ticks, no sample before next sync",
                old.ticks
            );
            self.stats.timestamps_dropped += 1;
        }
        // Zero ticks means nothing pending
        self.pending = (ts.ticks != 0).then_some(ts);
    }

    fn emit(&mut self, values: &[i16]) -> Result<()> {
        for &value in values {
            let record = OutputRecord {
                sequence_index: self.sequence_index,
                sample_value: value,
                timestamp: self.pending.take(),
            };
            self.sink.write_record(&record)?;

            if record.timestamp.is_some() {
                self.stats.timestamps_attached += 1;
            }
            self.stats.records += 1;
            self.sequence_index += 1;
        }
        Ok(())
    }

    /// Index the next sample will get
    pub fn sequence_index(&self) -> u64 {
        self.sequence_index
    }

    /// Timestamp waiting for the next sample
    pub fn pending_timestamp(&self) -> Option<Timestamp> {
        self.pending
    }

    /// Counters so far
    pub fn stats(&self) -> ReconstructStats {
        self.stats
    }

    /// Borrow the sink
    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Flush the sink and return it with the final counters
    ///
    /// A timestamp still pending at the end is discarded.
    pub fn finish(mut self) -> Result<(W, ReconstructStats)> {
        self.sink.flush()?;
        Ok((self.sink, self.stats))
    }
}
