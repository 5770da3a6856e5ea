//! Digital Signal Processing primitives for the filter chain
//!
//! This module provides:
//! - The `Effect` trait implemented by stereo processors
//! - Decibel conversions shared by the designer and the analyzer
//! - Biquad coefficients (RBJ cookbook forms) and their frequency response
//! - The stateful biquad section every band is built from
//!
//! All processing is designed for:
//! - Zero allocations in the hot path
//! - f32 samples in and out, f64 coefficients and state
//! - Deterministic output for identical input and coefficients

use crate::domain::audio::AudioError;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub type Result<T> = std::result::Result<T, AudioError>;

/// Core trait for stereo audio effects
///
/// All effects process audio in-place on interleaved f32 buffers normalized to [-1.0, 1.0].
pub trait Effect: Send + Sync {
    /// Process an interleaved stereo buffer in-place
    ///
    /// # Requirements
    /// - No allocations in the hot path
    /// - No locking
    /// - Handle buffers of any size up to the prepared maximum
    fn process(&mut self, buffer: &mut [f32]) -> Result<()>;

    /// Reset effect state to initial conditions
    fn reset(&mut self);

    /// Check if effect is bypassed (zero processing overhead when true)
    fn is_bypassed(&self) -> bool;

    /// Toggle bypass state
    fn set_bypass(&mut self, bypass: bool);

    /// Get effect name for debugging/display
    fn name(&self) -> &str;
}

// ============================================================================
// DECIBELS
// ============================================================================

/// Level treated as silence by the dB conversions
pub const MINUS_INFINITY_DB: f64 = -100.0;

/// Convert decibels to a linear gain factor
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    if db > MINUS_INFINITY_DB {
        10.0_f64.powf(db / 20.0)
    } else {
        0.0
    }
}

/// Convert a linear gain factor to decibels, floored at `MINUS_INFINITY_DB`
#[inline]
pub fn gain_to_db(gain: f64) -> f64 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(MINUS_INFINITY_DB)
    } else {
        MINUS_INFINITY_DB
    }
}

// ============================================================================
// BIQUAD COEFFICIENTS
// ============================================================================

/// Biquad filter coefficients
///
/// Normalized so that `a0 == 1`. Designed in f64: the low-frequency cut
/// sections put poles very close to the unit circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Peaking EQ (bell) filter
    ///
    /// Boosts or cuts frequencies around a center frequency.
    ///
    /// # Parameters
    /// - `sample_rate`: Audio sample rate in Hz
    /// - `freq`: Center frequency in Hz, inside (0, sample_rate / 2)
    /// - `q`: Quality factor, higher is narrower
    /// - `gain`: Linear gain at the center frequency
    #[must_use]
    pub fn peaking(sample_rate: f64, freq: f64, q: f64, gain: f64) -> Self {
        let a = gain.sqrt();
        let w0 = TAU * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos_w0,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w0,
            1.0 - alpha / a,
        )
    }

    /// Second-order lowpass, bilinear transform pre-warped at `freq`
    #[must_use]
    pub fn lowpass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let w0 = TAU * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::normalized(
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Second-order highpass, bilinear transform pre-warped at `freq`
    #[must_use]
    pub fn highpass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let w0 = TAU * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::normalized(
            (1.0 + cos_w0) / 2.0,
            -(1.0 + cos_w0),
            (1.0 + cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Complex response `H(e^{jw})` at `freq` Hz
    pub fn response(&self, freq: f64, sample_rate: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -TAU * freq / sample_rate);
        let z2 = z1 * z1;
        (z1 * self.b1 + z2 * self.b2 + self.b0) / (z1 * self.a1 + z2 * self.a2 + 1.0)
    }

    /// Linear magnitude at `freq` Hz
    pub fn magnitude(&self, freq: f64, sample_rate: f64) -> f64 {
        self.response(freq, sample_rate).norm()
    }

    /// Both poles strictly inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

// ============================================================================
// BIQUAD SECTION
// ============================================================================

/// Stateful biquad section using Transposed Direct Form II
///
/// Two state registers per section; one section instance belongs to exactly
/// one channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BiquadSection {
    coeffs: BiquadCoeffs,
    s1: f64,
    s2: f64,
    bypassed: bool,
}

impl BiquadSection {
    /// Create an active section with given coefficients
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            ..Default::default()
        }
    }

    /// Replace coefficients, keeping state
    ///
    /// Can be called between blocks for parameter changes.
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, x: f64) -> f64 {
        if self.bypassed {
            return x;
        }

        let c = &self.coeffs;
        let y = c.b0 * x + self.s1;
        self.s1 = c.b1 * x - c.a1 * y + self.s2;
        self.s2 = c.b2 * x - c.a2 * y;
        y
    }

    /// Process a buffer of samples
    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(f64::from(*sample)) as f32;
        }
    }

    /// Linear magnitude contributed at `freq` Hz; 1.0 when bypassed
    pub fn magnitude_for_frequency(&self, freq: f64, sample_rate: f64) -> f64 {
        if self.bypassed {
            1.0
        } else {
            self.coeffs.magnitude(freq, sample_rate)
        }
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }
}
