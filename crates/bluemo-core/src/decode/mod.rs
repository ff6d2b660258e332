//! Offline telemetry decoding
//!
//! The device does not pair timestamps with samples. It logs an RTC-sync
//! message now and then, and sample batches in between. Decoding correlates
//! the two by attaching the most recent sync to the next sample emitted:
//!
//! ```text
//! RtcSync(t1)  Batch[a b c]  Batch[d e]  RtcSync(t2)  RtcSync(t3)  Batch[f]
//!   0,a,t1  1,b  2,c  3,d  4,e  5,f,t3          (t2 is dropped)
//! ```

mod batch;
mod reconstruct;
mod rtc;
mod sink;

pub use batch::{SampleBatch, SAMPLE_WIDTH};
pub use reconstruct::{DecoderEvent, OutputRecord, ReconstructStats, Reconstructor};
pub use rtc::{rtc_to_ticks, Timestamp, RTC_COUNTER_WIDTH, RTC_TICK_SECONDS};
pub use sink::{CsvSink, RecordSink};
