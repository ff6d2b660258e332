//! Sample batch payloads

use crate::error::{Error, Result};

/// Bytes per packed sample (signed 16-bit little-endian)
pub const SAMPLE_WIDTH: usize = 2;

/// Raw payload of an analog or accelerometer stream message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBatch {
    /// Packed samples
    pub raw: Vec<u8>,
    /// Declared number of samples
    pub watermark: u16,
}

impl SampleBatch {
    /// Create a batch from a payload and its declared count
    pub fn new(raw: Vec<u8>, watermark: u16) -> Self {
        Self { raw, watermark }
    }

    /// Unpack the samples
    ///
    /// # Errors
    /// * `MalformedBatch` - if the payload is not exactly `watermark` samples
    pub fn decode(&self) -> Result<Vec<i16>> {
        if self.raw.len() != self.watermark as usize * SAMPLE_WIDTH {
            return Err(Error::MalformedBatch {
                len: self.raw.len(),
                watermark: self.watermark,
            });
        }

        Ok(self
            .raw
            .chunks_exact(SAMPLE_WIDTH)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_samples() {
        let batch = SampleBatch::new(vec![0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0xFF, 0x7F], 4);
        assert_eq!(batch.decode().unwrap(), vec![1, -1, i16::MIN, i16::MAX]);
    }

    #[test]
    fn test_decode_empty_batch() {
        let batch = SampleBatch::new(Vec::new(), 0);
        assert!(batch.decode().unwrap().is_empty());
    }

    #[test]
    fn test_decode_length_mismatch() {
        // Odd length
        let batch = SampleBatch::new(vec![0x01, 0x00, 0x02], 1);
        assert!(matches!(
            batch.decode(),
            Err(Error::MalformedBatch { len: 3, watermark: 1 })
        ));

        // Even length, wrong count
        let batch = SampleBatch::new(vec![0x01, 0x00, 0x02, 0x00], 3);
        assert!(matches!(
            batch.decode(),
            Err(Error::MalformedBatch { len: 4, watermark: 3 })
        ));
    }
}
