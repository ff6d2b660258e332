//! RTC counter decoding

use crate::error::{Error, Result};

/// Seconds per RTC tick (32.768 kHz crystal, as the device firmware rounds it)
pub const RTC_TICK_SECONDS: f64 = 0.0000305;

/// Width the raw counter is zero-padded to before interpretation
pub const RTC_COUNTER_WIDTH: usize = 8;

/// Interpret a variable-length little-endian RTC counter
///
/// The device sends only the significant low bytes of the counter. They are
/// zero-padded on the high end to 64 bits.
///
/// # Errors
/// * `InvalidCounter` - if more than 8 bytes are given
pub fn rtc_to_ticks(raw: &[u8]) -> Result<u64> {
    if raw.len() > RTC_COUNTER_WIDTH {
        return Err(Error::InvalidCounter(raw.len()));
    }

    let mut padded = [0u8; RTC_COUNTER_WIDTH];
    padded[..raw.len()].copy_from_slice(raw);
    Ok(u64::from_le_bytes(padded))
}

/// A device time, in RTC ticks since reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Raw tick count
    pub ticks: u64,
}

impl Timestamp {
    /// Create a timestamp from a tick count
    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Decode a timestamp from a raw RTC counter
    pub fn from_counter(raw: &[u8]) -> Result<Self> {
        rtc_to_ticks(raw).map(Self::from_ticks)
    }

    /// Seconds since device reset
    pub fn seconds(&self) -> f64 {
        self.ticks as f64 * RTC_TICK_SECONDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtc_full_width() {
        let raw = 0x0102_0304_0506_0708u64.to_le_bytes();
        assert_eq!(rtc_to_ticks(&raw).unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_rtc_zero_pads_high_bytes() {
        assert_eq!(rtc_to_ticks(&[0x01]).unwrap(), 1);
        assert_eq!(rtc_to_ticks(&[0x00, 0x80]).unwrap(), 0x8000);
        assert_eq!(rtc_to_ticks(&[0x78, 0x56, 0x34, 0x12, 0xFF]).unwrap(), 0xFF_1234_5678);
        // High byte set must not be sign-extended
        assert_eq!(rtc_to_ticks(&[0xFF, 0xFF, 0xFF]).unwrap(), 0x00FF_FFFF);
    }

    #[test]
    fn test_rtc_empty_is_zero() {
        assert_eq!(rtc_to_ticks(&[]).unwrap(), 0);
    }

    #[test]
    fn test_rtc_too_long() {
        assert!(matches!(rtc_to_ticks(&[0; 9]), Err(Error::InvalidCounter(9))));
    }

    #[test]
    fn test_timestamp_seconds() {
        let ts = Timestamp::from_counter(&[0x00, 0x80]).unwrap();
        assert_eq!(ts.ticks, 32768);
        assert!((ts.seconds() - 0.999424).abs() < 1e-9);
    }
}
