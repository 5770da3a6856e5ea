//! Coefficient designer
//!
//! Pure functions from a parameter snapshot and a sample rate to biquad
//! coefficients. Nothing here allocates, so the audio thread calls these once
//! per block.
//!
//! Callers are responsible for keeping frequencies below Nyquist; the
//! designer does not re-validate them.

use crate::domain::dsp::{db_to_gain, BiquadCoeffs};
use crate::domain::params::ChainSettings;
use std::f64::consts::PI;

/// Sections available to a cut band (48 dB/Oct)
pub const MAX_CUT_SECTIONS: usize = 4;

/// Highest Butterworth order a cut band can realize
pub const MAX_BUTTERWORTH_ORDER: usize = 2 * MAX_CUT_SECTIONS;

/// Second-order sections of one Butterworth cut, in fixed storage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutCoefficients {
    sections: [BiquadCoeffs; MAX_CUT_SECTIONS],
    len: usize,
}

impl CutCoefficients {
    pub fn as_slice(&self) -> &[BiquadCoeffs] {
        &self.sections[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BiquadCoeffs> {
        self.as_slice().iter()
    }
}

/// Q of the `k`-th conjugate pole pair of an even-order Butterworth prototype
pub fn butterworth_q(order: usize, k: usize) -> f64 {
    let angle = PI * (2 * k + 1) as f64 / (2 * order) as f64;
    1.0 / (2.0 * angle.cos())
}

fn butterworth(order: usize, section: impl Fn(f64) -> BiquadCoeffs) -> CutCoefficients {
    debug_assert!(
        order >= 2 && order % 2 == 0 && order <= MAX_BUTTERWORTH_ORDER,
        "unsupported Butterworth order {order}"
    );

    let len = (order / 2).clamp(1, MAX_CUT_SECTIONS);
    let mut sections = [BiquadCoeffs::default(); MAX_CUT_SECTIONS];
    for (k, coeffs) in sections.iter_mut().take(len).enumerate() {
        *coeffs = section(butterworth_q(2 * len, k));
    }

    CutCoefficients { sections, len }
}

/// Even-order Butterworth highpass as `order / 2` cascaded sections
pub fn butterworth_highpass(freq: f64, sample_rate: f64, order: usize) -> CutCoefficients {
    butterworth(order, |q| BiquadCoeffs::highpass(sample_rate, freq, q))
}

/// Even-order Butterworth lowpass as `order / 2` cascaded sections
pub fn butterworth_lowpass(freq: f64, sample_rate: f64, order: usize) -> CutCoefficients {
    butterworth(order, |q| BiquadCoeffs::lowpass(sample_rate, freq, q))
}

/// Peak band coefficients
pub fn peak_filter(settings: &ChainSettings, sample_rate: f64) -> BiquadCoeffs {
    BiquadCoeffs::peaking(
        sample_rate,
        f64::from(settings.peak_freq),
        f64::from(settings.peak_q),
        db_to_gain(f64::from(settings.peak_gain_db)),
    )
}

/// Low-cut (highpass) sections for the selected slope
pub fn low_cut_filter(settings: &ChainSettings, sample_rate: f64) -> CutCoefficients {
    butterworth_highpass(
        f64::from(settings.low_cut_freq),
        sample_rate,
        settings.low_cut_slope.butterworth_order(),
    )
}

/// High-cut (lowpass) sections for the selected slope
pub fn high_cut_filter(settings: &ChainSettings, sample_rate: f64) -> CutCoefficients {
    butterworth_lowpass(
        f64::from(settings.high_cut_freq),
        sample_rate,
        settings.high_cut_slope.butterworth_order(),
    )
}
