//! Audio-path errors and processing setup
//!
//! The audio context may only ever see allocation-free error values, so every
//! variant reachable from `process` carries plain numbers. String payloads are
//! reserved for errors raised from the control context.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    /// Sample rate is zero, negative or not a number
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    /// Maximum block size of zero
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    /// Sample rate too low to represent the full frequency domain
    #[error("Unsupported sample rate: {sample_rate} Hz (Nyquist must exceed {max_frequency} Hz)")]
    UnsupportedSampleRate { sample_rate: f64, max_frequency: f64 },

    /// `process` called before `prepare`
    #[error("Processor has not been prepared")]
    NotPrepared,

    /// Block is longer than the size given to `prepare`
    #[error("Block of {len} samples exceeds prepared maximum of {max}")]
    BlockTooLarge { len: usize, max: usize },

    /// Left and right buffers differ in length
    #[error("Channel length mismatch: left={left}, right={right}")]
    ChannelMismatch { left: usize, right: usize },

    /// Error while running the audio thread
    #[error("Stream error: {0}")]
    StreamError(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Everything a chain needs to know before processing its first sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessSpec {
    pub sample_rate: f64,
    pub maximum_block_size: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f64, maximum_block_size: usize) -> Self {
        Self {
            sample_rate,
            maximum_block_size,
        }
    }

    /// Nyquist frequency in Hz
    pub fn nyquist(&self) -> f64 {
        self.sample_rate * 0.5
    }

    /// Reject configurations the engine must never process audio with.
    ///
    /// Every frequency parameter may legally sit at `max_frequency`, so the
    /// Nyquist frequency has to lie strictly above it.
    pub fn validate(&self, max_frequency: f64) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(AudioError::InvalidSampleRate(self.sample_rate));
        }
        if self.maximum_block_size == 0 {
            return Err(AudioError::InvalidBlockSize(self.maximum_block_size));
        }
        if self.nyquist() <= max_frequency {
            return Err(AudioError::UnsupportedSampleRate {
                sample_rate: self.sample_rate,
                max_frequency,
            });
        }
        Ok(())
    }
}

impl Default for ProcessSpec {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            maximum_block_size: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_spec_default() {
        let spec = ProcessSpec::default();
        assert_eq!(spec.sample_rate, 48000.0);
        assert_eq!(spec.maximum_block_size, 512);
        assert_eq!(spec.nyquist(), 24000.0);
        assert!(spec.validate(20000.0).is_ok());
    }

    #[test]
    fn test_process_spec_rejects_bad_sample_rate() {
        for rate in [0.0, -44100.0, f64::NAN, f64::INFINITY] {
            let spec = ProcessSpec::new(rate, 256);
            assert!(matches!(
                spec.validate(20000.0),
                Err(AudioError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn test_process_spec_rejects_zero_block() {
        let spec = ProcessSpec::new(48000.0, 0);
        assert_eq!(spec.validate(20000.0), Err(AudioError::InvalidBlockSize(0)));
    }

    #[test]
    fn test_process_spec_rejects_low_nyquist() {
        let spec = ProcessSpec::new(32000.0, 256);
        assert!(matches!(
            spec.validate(20000.0),
            Err(AudioError::UnsupportedSampleRate { .. })
        ));
        assert!(ProcessSpec::new(44100.0, 256).validate(20000.0).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = AudioError::BlockTooLarge { len: 1024, max: 512 };
        assert_eq!(
            err.to_string(),
            "Block of 1024 samples exceeds prepared maximum of 512"
        );
    }
}
